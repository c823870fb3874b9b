//! hats-algorithms: Histogram of Averaged Time Surfaces encoding.
//!
//! This crate provides the stages of the HATS pipeline:
//! - **Lookup** - pixel to cell mapping over a ceil-divided grid
//! - **Memory** - per (cell, polarity) time-windowed event queues
//! - **Surface** - exponentially decayed local time surface around an event
//! - **Accumulator** - rolling sum of the last N surfaces per (cell, polarity)
//! - **Compositor** - tiling of per-cell histograms into one frame
//! - **Engine** - batch ingestion tying the stages together
//!
#![warn(missing_docs)]

pub mod accumulator;
pub mod compositor;
mod counter;
mod engine;
pub mod lookup;
pub mod memory;
pub mod surface;

pub use accumulator::{
    CellHistograms, HatsAccumulator, RollingHistogram, DEFAULT_NORMALIZATION_EPSILON,
};
pub use compositor::{composite, composite_normalized};
pub use counter::{PositiveEventCounter, DEFAULT_PRINT_INTERVAL};
pub use engine::HatsEngine;
pub use lookup::CellLookup;
pub use memory::{CellMemory, TemporalMemory};
pub use surface::{compute_local_surface, SurfaceParams};

// Re-export core types used throughout the public API
pub use hats_core::{Error, Event, HatsConfig, IngestReport, IngestStatistics, Polarity, Result};
