//! Engine configuration with validated parameter ranges.
#![allow(clippy::doc_markdown)]

use crate::error::{Error, Result};
use std::ops::RangeInclusive;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "serde")]
use std::{fs::File, io::BufReader, path::Path};

/// Timestamp ticks per second for microsecond event streams.
pub const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Accepted neighborhood radius values.
pub const RADIUS_RANGE: RangeInclusive<u16> = 0..=32;
/// Accepted cell sizes (pixels).
pub const CELL_SIZE_RANGE: RangeInclusive<u16> = 1..=1024;
/// Accepted temporal windows (microseconds).
pub const TEMPORAL_WINDOW_RANGE: RangeInclusive<i64> = 1..=60_000_000;
/// Accepted rolling window lengths (surfaces).
pub const WINDOW_SIZE_RANGE: RangeInclusive<usize> = 5..=100;

/// Configuration for the HATS encoding engine.
///
/// Values outside their accepted ranges are rejected by [`HatsConfig::validate`],
/// never clamped.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HatsConfig {
    /// Neighborhood radius R; surfaces are `(2R+1) x (2R+1)`.
    pub radius: u16,
    /// Cell size K in pixels.
    pub cell_size: u16,
    /// Maximum age of events kept in a cell's memory (microseconds).
    pub temporal_window_us: i64,
    /// Decay constant in seconds.
    pub tau: f64,
    /// Number of local surfaces summed by each rolling histogram.
    pub window_size: usize,
    /// Timestamp ticks per second.
    pub time_scale: f64,
    /// Process cells concurrently within a batch.
    pub parallel: bool,
}

impl Default for HatsConfig {
    fn default() -> Self {
        Self {
            radius: 8,
            cell_size: 8,
            temporal_window_us: 100_000, // 0.1 s
            tau: 0.5,
            window_size: 30,
            time_scale: MICROS_PER_SECOND,
            parallel: false,
        }
    }
}

impl HatsConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the neighborhood radius.
    #[must_use]
    pub fn with_radius(mut self, radius: u16) -> Self {
        self.radius = radius;
        self
    }

    /// Sets the cell size.
    #[must_use]
    pub fn with_cell_size(mut self, cell_size: u16) -> Self {
        self.cell_size = cell_size;
        self
    }

    /// Sets the temporal window (microseconds).
    #[must_use]
    pub fn with_temporal_window_us(mut self, window: i64) -> Self {
        self.temporal_window_us = window;
        self
    }

    /// Sets the decay constant (seconds).
    #[must_use]
    pub fn with_tau(mut self, tau: f64) -> Self {
        self.tau = tau;
        self
    }

    /// Sets the rolling window length.
    #[must_use]
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    /// Sets the number of timestamp ticks per second.
    #[must_use]
    pub fn with_time_scale(mut self, time_scale: f64) -> Self {
        self.time_scale = time_scale;
        self
    }

    /// Enables or disables cell-parallel ingestion.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Side length of a local surface, `2R + 1`.
    #[inline]
    #[must_use]
    pub fn surface_side(&self) -> usize {
        2 * usize::from(self.radius) + 1
    }

    /// Checks every parameter against its accepted range.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] naming the first rejected parameter.
    pub fn validate(&self) -> Result<()> {
        if !RADIUS_RANGE.contains(&self.radius) {
            return Err(Error::invalid_config(
                "radius",
                self.radius,
                format!("must be in {RADIUS_RANGE:?}"),
            ));
        }
        if !CELL_SIZE_RANGE.contains(&self.cell_size) {
            return Err(Error::invalid_config(
                "cell_size",
                self.cell_size,
                format!("must be in {CELL_SIZE_RANGE:?}"),
            ));
        }
        if !TEMPORAL_WINDOW_RANGE.contains(&self.temporal_window_us) {
            return Err(Error::invalid_config(
                "temporal_window_us",
                self.temporal_window_us,
                format!("must be in {TEMPORAL_WINDOW_RANGE:?}"),
            ));
        }
        if !self.tau.is_finite() || self.tau <= 0.0 {
            return Err(Error::invalid_config(
                "tau",
                self.tau,
                "must be finite and positive",
            ));
        }
        if !WINDOW_SIZE_RANGE.contains(&self.window_size) {
            return Err(Error::invalid_config(
                "window_size",
                self.window_size,
                format!("must be in {WINDOW_SIZE_RANGE:?}"),
            ));
        }
        if !self.time_scale.is_finite() || self.time_scale <= 0.0 {
            return Err(Error::invalid_config(
                "time_scale",
                self.time_scale,
                "must be finite and positive",
            ));
        }
        Ok(())
    }

    /// Load and validate a configuration from a JSON string.
    ///
    /// Missing fields fall back to their defaults.
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed or a value is out of range.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    #[cfg(feature = "serde")]
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns true if switching to `other` changes the cell or surface layout.
    #[must_use]
    pub fn geometry_differs(&self, other: &Self) -> bool {
        self.radius != other.radius || self.cell_size != other.cell_size
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = HatsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.radius, 8);
        assert_eq!(config.cell_size, 8);
        assert_eq!(config.temporal_window_us, 100_000);
        assert_eq!(config.window_size, 30);
        assert_eq!(config.surface_side(), 17);
    }

    #[test]
    fn test_builder() {
        let config = HatsConfig::new()
            .with_radius(2)
            .with_cell_size(4)
            .with_temporal_window_us(5_000)
            .with_tau(0.01)
            .with_window_size(10)
            .with_parallel(true);

        assert_eq!(config.radius, 2);
        assert_eq!(config.cell_size, 4);
        assert_eq!(config.temporal_window_us, 5_000);
        assert_eq!(config.tau, 0.01);
        assert_eq!(config.window_size, 10);
        assert!(config.parallel);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let cases = [
            ("radius", HatsConfig::new().with_radius(33)),
            ("cell_size", HatsConfig::new().with_cell_size(0)),
            ("temporal_window_us", HatsConfig::new().with_temporal_window_us(0)),
            ("tau", HatsConfig::new().with_tau(0.0)),
            ("tau", HatsConfig::new().with_tau(f64::NAN)),
            ("window_size", HatsConfig::new().with_window_size(4)),
            ("window_size", HatsConfig::new().with_window_size(101)),
            ("time_scale", HatsConfig::new().with_time_scale(-1.0)),
        ];

        for (name, config) in cases {
            match config.validate() {
                Err(Error::InvalidConfig { parameter, .. }) => assert_eq!(parameter, name),
                other => panic!("expected {name} to be rejected, got {other:?}"),
            }
        }
    }

    #[test]
    #[cfg(feature = "serde")]
    fn test_json_partial_config() {
        let config = HatsConfig::from_json(r#"{ "radius": 4, "tau": 0.25 }"#).unwrap();
        assert_eq!(config.radius, 4);
        assert_eq!(config.tau, 0.25);
        assert_eq!(config.cell_size, 8); // Default
        assert_eq!(config.window_size, 30); // Default
    }

    #[test]
    #[cfg(feature = "serde")]
    fn test_json_rejects_invalid_value() {
        let result = HatsConfig::from_json(r#"{ "window_size": 1000 }"#);
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    #[cfg(feature = "serde")]
    fn test_json_malformed() {
        let result = HatsConfig::from_json("{ radius: ");
        assert!(matches!(result, Err(Error::ConfigParse(_))));
    }

    #[test]
    #[cfg(feature = "serde")]
    fn test_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "cell_size": 16, "parallel": true }}"#).unwrap();
        file.flush().unwrap();

        let config = HatsConfig::from_file(file.path()).unwrap();
        assert_eq!(config.cell_size, 16);
        assert!(config.parallel);
    }

    #[test]
    fn test_geometry_differs() {
        let base = HatsConfig::default();
        assert!(!base.geometry_differs(&base.clone().with_tau(1.0)));
        assert!(base.geometry_differs(&base.clone().with_radius(3)));
        assert!(base.geometry_differs(&base.clone().with_cell_size(16)));
    }
}
