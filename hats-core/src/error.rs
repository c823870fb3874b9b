//! Error types for hats-core.

use thiserror::Error;

/// Result type alias for hats operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for hats operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration parameter is outside its accepted range.
    #[error("invalid configuration: {parameter} = {value} ({reason})")]
    InvalidConfig {
        parameter: &'static str,
        value: String,
        reason: String,
    },

    /// Sensor geometry cannot be partitioned into cells.
    #[error("invalid sensor geometry {width}x{height} with cell size {cell_size}")]
    InvalidGeometry {
        width: u32,
        height: u32,
        cell_size: u32,
    },

    /// Compositing grid does not cover the configured cells.
    #[error("grid {grid_cols}x{grid_rows} does not match {n_cells} cells")]
    GridMismatch {
        grid_cols: usize,
        grid_rows: usize,
        n_cells: usize,
    },

    /// An accumulator has a shape inconsistent with the neighborhood size.
    #[error("cell {cell} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        cell: usize,
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// Tiles could not be assembled into a frame.
    #[error("frame layout error: {0}")]
    Layout(String),

    /// Cell index outside the lookup table.
    #[error("cell index {cell} out of range (n_cells = {n_cells})")]
    UnknownCell { cell: usize, n_cells: usize },

    /// Configuration file could not be parsed.
    #[cfg(feature = "serde")]
    #[error("configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Builds an [`Error::InvalidConfig`] for a rejected parameter value.
    pub fn invalid_config(
        parameter: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidConfig {
            parameter,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
