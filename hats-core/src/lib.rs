//! hats-core: Core types for Histogram of Averaged Time Surfaces encoding.
//!
//! This crate provides the event value type, the engine configuration with
//! its validated parameter ranges, ingestion reports, and the shared error
//! type used across the workspace.
//!

pub mod config;
pub mod error;
pub mod event;
pub mod report;

pub use config::{HatsConfig, MICROS_PER_SECOND};
pub use error::{Error, Result};
pub use event::{Event, Polarity};
pub use report::{IngestReport, IngestStatistics};
