//! Frame compositor.
//!
//! Tiles the per-cell accumulator sums of one polarity into a single dense
//! image laid out like the cell grid: cell `i` lands at grid row
//! `i / grid_cols`, grid column `i % grid_cols`.

use crate::accumulator::HatsAccumulator;
use hats_core::{Error, Polarity, Result};
use ndarray::{concatenate, Array2, ArrayView2, Axis};

/// Tiles the running sums of `polarity` into one image.
///
/// `side` is the configured neighborhood `2R+1`. The result has
/// `grid_rows * side` rows and `grid_cols * side` columns.
///
/// # Errors
/// Returns [`Error::GridMismatch`] if `grid_cols * grid_rows` differs from the
/// number of cells, or [`Error::ShapeMismatch`] if a sum is not `side x side`.
pub fn composite(
    accumulator: &HatsAccumulator,
    grid_cols: usize,
    grid_rows: usize,
    side: usize,
    polarity: Polarity,
) -> Result<Array2<f64>> {
    let tiles: Vec<ArrayView2<'_, f64>> = accumulator
        .lanes(polarity)
        .map(|histogram| histogram.sum())
        .collect();
    tile(&tiles, grid_cols, grid_rows, side)
}

/// Tiles the normalized sums (`sum / (count + epsilon)`) of `polarity`.
///
/// # Errors
/// Same as [`composite`].
pub fn composite_normalized(
    accumulator: &HatsAccumulator,
    grid_cols: usize,
    grid_rows: usize,
    side: usize,
    polarity: Polarity,
    epsilon: f64,
) -> Result<Array2<f64>> {
    let normalized: Vec<Array2<f64>> = accumulator
        .lanes(polarity)
        .map(|histogram| histogram.normalized(epsilon))
        .collect();
    let tiles: Vec<ArrayView2<'_, f64>> = normalized.iter().map(Array2::view).collect();
    tile(&tiles, grid_cols, grid_rows, side)
}

/// Concatenates square tiles into a `grid_rows x grid_cols` mosaic.
///
/// # Errors
/// Returns an error if the grid does not match the tile count or a tile is not `side x side`.
pub fn tile(
    tiles: &[ArrayView2<'_, f64>],
    grid_cols: usize,
    grid_rows: usize,
    side: usize,
) -> Result<Array2<f64>> {
    if grid_cols * grid_rows != tiles.len() {
        return Err(Error::GridMismatch {
            grid_cols,
            grid_rows,
            n_cells: tiles.len(),
        });
    }

    if let Some((cell, tile)) = tiles
        .iter()
        .enumerate()
        .find(|(_, tile)| tile.dim() != (side, side))
    {
        return Err(Error::ShapeMismatch {
            cell,
            expected: (side, side),
            found: tile.dim(),
        });
    }

    if tiles.is_empty() {
        return Ok(Array2::zeros((0, 0)));
    }

    let rows = tiles
        .chunks(grid_cols)
        .map(|row| concatenate(Axis(1), row))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Layout(e.to_string()))?;
    let row_views: Vec<ArrayView2<'_, f64>> = rows.iter().map(Array2::view).collect();

    concatenate(Axis(0), &row_views).map_err(|e| Error::Layout(e.to_string()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp, clippy::cast_precision_loss)]
    use super::*;

    #[test]
    fn test_composite_shape() {
        let accumulator = HatsAccumulator::new(256, 17, 30);
        let frame = composite(&accumulator, 16, 16, 17, Polarity::On).unwrap();
        assert_eq!(frame.dim(), (16 * 17, 16 * 17));
    }

    #[test]
    fn test_non_square_grid_layout() {
        // 3 columns x 2 rows of 2x2 tiles, each filled with its cell index.
        let mut accumulator = HatsAccumulator::new(6, 2, 5);
        for cell in 0..6 {
            accumulator.push(cell, Polarity::On, Array2::from_elem((2, 2), cell as f64));
        }

        let frame = composite(&accumulator, 3, 2, 2, Polarity::On).unwrap();
        assert_eq!(frame.dim(), (4, 6));
        assert_eq!(frame[[0, 0]], 0.0);
        assert_eq!(frame[[0, 2]], 1.0);
        assert_eq!(frame[[1, 5]], 2.0);
        assert_eq!(frame[[2, 0]], 3.0);
        assert_eq!(frame[[3, 3]], 4.0);
        assert_eq!(frame[[3, 5]], 5.0);
    }

    #[test]
    fn test_polarity_selection() {
        let mut accumulator = HatsAccumulator::new(1, 1, 5);
        accumulator.push(0, Polarity::Off, Array2::from_elem((1, 1), 2.0));

        assert_eq!(composite(&accumulator, 1, 1, 1, Polarity::On).unwrap()[[0, 0]], 0.0);
        assert_eq!(composite(&accumulator, 1, 1, 1, Polarity::Off).unwrap()[[0, 0]], 2.0);
    }

    #[test]
    fn test_grid_mismatch() {
        let accumulator = HatsAccumulator::new(12, 3, 5);
        let result = composite(&accumulator, 4, 4, 3, Polarity::On);
        assert!(matches!(
            result,
            Err(Error::GridMismatch {
                grid_cols: 4,
                grid_rows: 4,
                n_cells: 12
            })
        ));
    }

    #[test]
    fn test_shape_mismatch() {
        let good = Array2::<f64>::zeros((3, 3));
        let bad = Array2::<f64>::zeros((2, 3));
        let tiles = [good.view(), bad.view()];

        let result = tile(&tiles, 2, 1, 3);
        assert!(matches!(
            result,
            Err(Error::ShapeMismatch {
                cell: 1,
                expected: (3, 3),
                found: (2, 3)
            })
        ));
    }

    #[test]
    fn test_declared_side_mismatch() {
        // Histograms hold 3x3 sums but the neighborhood is declared as 5x5.
        let accumulator = HatsAccumulator::new(4, 3, 5);
        let result = composite(&accumulator, 2, 2, 5, Polarity::On);
        assert!(matches!(
            result,
            Err(Error::ShapeMismatch {
                cell: 0,
                expected: (5, 5),
                found: (3, 3)
            })
        ));

        let result = composite_normalized(&accumulator, 2, 2, 5, Polarity::Off, 1e-9);
        assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_composite_normalized() {
        let mut accumulator = HatsAccumulator::new(2, 1, 5);
        accumulator.push(0, Polarity::On, Array2::from_elem((1, 1), 2.0));
        accumulator.push(0, Polarity::On, Array2::from_elem((1, 1), 4.0));

        let frame = composite_normalized(&accumulator, 2, 1, 1, Polarity::On, 0.0).unwrap();
        assert_eq!(frame[[0, 0]], 3.0);
        // Empty cell: 0 / (0 + epsilon) stays zero.
        let frame = composite_normalized(&accumulator, 2, 1, 1, Polarity::On, 1e-9).unwrap();
        assert_eq!(frame[[0, 1]], 0.0);
    }
}
