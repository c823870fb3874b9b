//! Pixel to cell lookup table.
//!
//! The sensor plane is partitioned into a regular grid of
//! `cell_size x cell_size` pixel cells, numbered row-major:
//! `cell = (y / cell_size) * grid_cols + (x / cell_size)`.
//! Sensors whose size is not a multiple of the cell size get a partial last
//! column/row of cells, so every pixel resolves to a valid index.
#![allow(clippy::cast_possible_truncation)]

use hats_core::{Error, Result};
use ndarray::Array2;

#[inline]
fn ceil_div(a: u32, b: u32) -> u32 {
    a.div_ceil(b)
}

/// Precomputed mapping from pixel coordinate to cell index.
#[derive(Debug, Clone)]
pub struct CellLookup {
    width: u32,
    height: u32,
    cell_size: u32,
    grid_cols: usize,
    grid_rows: usize,
    /// Indexed `[y, x]`.
    table: Array2<u32>,
}

impl CellLookup {
    /// Builds the lookup table for a `width x height` sensor.
    ///
    /// # Errors
    /// Returns [`Error::InvalidGeometry`] if any dimension or the cell size is
    /// zero, or if a dimension exceeds the `u16` coordinate range of events.
    pub fn new(width: u32, height: u32, cell_size: u32) -> Result<Self> {
        let max_side = u32::from(u16::MAX) + 1;
        if width == 0
            || height == 0
            || cell_size == 0
            || width > max_side
            || height > max_side
        {
            return Err(Error::InvalidGeometry {
                width,
                height,
                cell_size,
            });
        }

        let grid_cols = ceil_div(width, cell_size);
        let grid_rows = ceil_div(height, cell_size);

        let table = Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
            let row = y as u32 / cell_size;
            let col = x as u32 / cell_size;
            row * grid_cols + col
        });

        Ok(Self {
            width,
            height,
            cell_size,
            grid_cols: grid_cols as usize,
            grid_rows: grid_rows as usize,
            table,
        })
    }

    /// Returns the cell containing pixel `(x, y)`, or `None` outside the sensor.
    #[inline]
    #[must_use]
    pub fn cell_index(&self, x: u16, y: u16) -> Option<usize> {
        self.table
            .get((usize::from(y), usize::from(x)))
            .map(|&cell| cell as usize)
    }

    /// Top-left pixel of a cell.
    ///
    /// # Errors
    /// Returns [`Error::UnknownCell`] if `cell >= n_cells`.
    pub fn cell_origin(&self, cell: usize) -> Result<(u32, u32)> {
        if cell >= self.n_cells() {
            return Err(Error::UnknownCell {
                cell,
                n_cells: self.n_cells(),
            });
        }
        let col = (cell % self.grid_cols) as u32;
        let row = (cell / self.grid_cols) as u32;
        Ok((col * self.cell_size, row * self.cell_size))
    }

    /// Number of cells in the grid.
    #[inline]
    #[must_use]
    pub fn n_cells(&self) -> usize {
        self.grid_cols * self.grid_rows
    }

    /// Cells per grid row.
    #[must_use]
    pub fn grid_cols(&self) -> usize {
        self.grid_cols
    }

    /// Cells per grid column.
    #[must_use]
    pub fn grid_rows(&self) -> usize {
        self.grid_rows
    }

    /// Cell side length in pixels.
    #[must_use]
    pub fn cell_size(&self) -> u32 {
        self.cell_size
    }

    /// Sensor width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Sensor height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }
}
