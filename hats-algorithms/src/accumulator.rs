//! Rolling histogram of averaged time surfaces (HATS).
//!
//! Each (cell, polarity) keeps the sum of its last `window_size` local
//! surfaces. The sum is maintained incrementally: a push adds the newest
//! surface and, once the window is full, subtracts the one that falls out.
//! The cost per push is O(surface size) regardless of the window length.
#![allow(clippy::cast_precision_loss)]

use hats_core::Polarity;
use ndarray::{Array2, ArrayView2};
use std::collections::VecDeque;

/// Default stabilizing constant for [`RollingHistogram::normalized`].
pub const DEFAULT_NORMALIZATION_EPSILON: f64 = 1e-9;

/// Windowed running sum of local surfaces for one (cell, polarity).
#[derive(Debug, Clone)]
pub struct RollingHistogram {
    window_size: usize,
    sum: Array2<f64>,
    history: VecDeque<Array2<f64>>,
}

impl RollingHistogram {
    /// Creates an empty histogram of `side x side` surfaces.
    #[must_use]
    pub fn new(side: usize, window_size: usize) -> Self {
        Self {
            window_size,
            sum: Array2::zeros((side, side)),
            history: VecDeque::with_capacity(window_size + 1),
        }
    }

    /// Adds a surface to the window, retiring the oldest one if the window overflows.
    ///
    /// # Panics
    /// Panics if the surface shape differs from the histogram shape. In debug
    /// builds, also panics if the running sum diverges from its history.
    pub fn push(&mut self, surface: Array2<f64>) {
        assert_eq!(
            surface.dim(),
            self.sum.dim(),
            "surface shape does not match histogram"
        );

        self.sum += &surface;
        self.history.push_back(surface);

        if self.history.len() > self.window_size {
            if let Some(oldest) = self.history.pop_front() {
                self.sum -= &oldest;
            }
        }

        #[cfg(debug_assertions)]
        self.assert_consistent();
    }

    /// Current running sum (read-only).
    #[must_use]
    pub fn sum(&self) -> ArrayView2<'_, f64> {
        self.sum.view()
    }

    /// Surfaces currently in the window, oldest first.
    pub fn history(&self) -> impl ExactSizeIterator<Item = &Array2<f64>> + '_ {
        self.history.iter()
    }

    /// Number of surfaces contributing to the sum.
    #[must_use]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Returns true if no surface has been pushed since the last clear.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Maximum number of surfaces in the window.
    #[must_use]
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Side length of the surfaces.
    #[must_use]
    pub fn side(&self) -> usize {
        self.sum.nrows()
    }

    /// Recomputes the sum of the window from scratch.
    #[must_use]
    pub fn recompute_sum(&self) -> Array2<f64> {
        let mut total = Array2::zeros(self.sum.raw_dim());
        for surface in &self.history {
            total += surface;
        }
        total
    }

    /// Largest absolute difference between the running sum and a fresh recomputation.
    #[must_use]
    pub fn drift(&self) -> f64 {
        let reference = self.recompute_sum();
        self.sum
            .iter()
            .zip(reference.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }

    /// Sum averaged over the contributing surfaces, `sum / (len + epsilon)`.
    #[must_use]
    pub fn normalized(&self, epsilon: f64) -> Array2<f64> {
        let denom = self.history.len() as f64 + epsilon;
        self.sum.mapv(|value| value / denom)
    }

    /// Empties the window and zeroes the sum.
    pub fn clear(&mut self) {
        self.history.clear();
        self.sum.fill(0.0);
    }

    #[cfg(debug_assertions)]
    fn assert_consistent(&self) {
        let scale = self.sum.iter().fold(1.0f64, |acc, v| acc.max(v.abs()));
        let drift = self.drift();
        assert!(
            drift <= 1e-6 * scale,
            "rolling sum diverged from its history by {drift}"
        );
    }
}

/// Histograms for one cell, one per polarity.
#[derive(Debug, Clone)]
pub struct CellHistograms {
    lanes: [RollingHistogram; Polarity::COUNT],
}

impl CellHistograms {
    /// Creates empty histograms for both polarities.
    #[must_use]
    pub fn new(side: usize, window_size: usize) -> Self {
        Self {
            lanes: [
                RollingHistogram::new(side, window_size),
                RollingHistogram::new(side, window_size),
            ],
        }
    }

    /// Histogram of one polarity.
    #[must_use]
    pub fn lane(&self, polarity: Polarity) -> &RollingHistogram {
        &self.lanes[polarity.index()]
    }

    /// Pushes a surface into the histogram of one polarity.
    pub fn push(&mut self, polarity: Polarity, surface: Array2<f64>) {
        self.lanes[polarity.index()].push(surface);
    }

    fn clear(&mut self) {
        for lane in &mut self.lanes {
            lane.clear();
        }
    }
}

/// Rolling histograms for every (cell, polarity) of the sensor.
#[derive(Debug, Clone)]
pub struct HatsAccumulator {
    side: usize,
    window_size: usize,
    cells: Vec<CellHistograms>,
}

impl HatsAccumulator {
    /// Creates accumulators for `n_cells` cells of `side x side` surfaces.
    #[must_use]
    pub fn new(n_cells: usize, side: usize, window_size: usize) -> Self {
        Self {
            side,
            window_size,
            cells: vec![CellHistograms::new(side, window_size); n_cells],
        }
    }

    /// Pushes a surface into the histogram of `(cell, polarity)`.
    ///
    /// # Panics
    /// Panics if `cell` is out of range or the surface shape is wrong.
    pub fn push(&mut self, cell: usize, polarity: Polarity, surface: Array2<f64>) {
        self.cells[cell].push(polarity, surface);
    }

    /// Running sum of `(cell, polarity)`.
    ///
    /// # Panics
    /// Panics if `cell` is out of range.
    #[must_use]
    pub fn sum(&self, cell: usize, polarity: Polarity) -> ArrayView2<'_, f64> {
        self.cells[cell].lane(polarity).sum()
    }

    /// Normalized sum of `(cell, polarity)`.
    ///
    /// # Panics
    /// Panics if `cell` is out of range.
    #[must_use]
    pub fn normalized(&self, cell: usize, polarity: Polarity, epsilon: f64) -> Array2<f64> {
        self.cells[cell].lane(polarity).normalized(epsilon)
    }

    /// Histogram of `(cell, polarity)`, if the cell exists.
    #[must_use]
    pub fn histogram(&self, cell: usize, polarity: Polarity) -> Option<&RollingHistogram> {
        self.cells.get(cell).map(|histograms| histograms.lane(polarity))
    }

    /// Number of cells.
    #[must_use]
    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    /// Side length of the surfaces.
    #[must_use]
    pub fn side(&self) -> usize {
        self.side
    }

    /// Rolling window length.
    #[must_use]
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Iterates over the histograms of one polarity in cell order.
    pub fn lanes(&self, polarity: Polarity) -> impl ExactSizeIterator<Item = &RollingHistogram> + '_ {
        self.cells.iter().map(move |histograms| histograms.lane(polarity))
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [CellHistograms] {
        &mut self.cells
    }

    pub(crate) fn cell_mut(&mut self, cell: usize) -> &mut CellHistograms {
        &mut self.cells[cell]
    }

    /// Empties every histogram.
    pub fn clear(&mut self) {
        for histograms in &mut self.cells {
            histograms.clear();
        }
    }
}
