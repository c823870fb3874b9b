//! hats-io: Event file reading and frame writing for hats.
//!
//! Event files are memory-mapped via memmap2 and parsed as `t x y p` text
//! lines. Composited frames are written as PGM or PNG through the `image`
//! crate, or as CSV.
//!

mod error;
mod reader;
mod writer;

pub use error::{Error, Result};
pub use reader::{infer_sensor_size, EventBatches, EventFileReader, MappedFileReader};
pub use writer::{scale_to_u8, to_gray_image, FrameFormat, FrameWriter};
