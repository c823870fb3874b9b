//! Local time-surface computation.
//!
//! A local time surface is a `(2R+1) x (2R+1)` map centered on a trigger
//! event. Every remembered event of the same cell and polarity that falls
//! inside the neighborhood contributes `exp(-(t_i - t_j) / tau)` at its
//! relative offset. Events outside the neighborhood are ignored.
#![allow(clippy::cast_precision_loss)]

use hats_core::{Event, HatsConfig};
use ndarray::Array2;

/// Parameters of the local surface computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceParams {
    /// Neighborhood radius R.
    pub radius: u16,
    /// Decay constant in seconds.
    pub tau: f64,
    /// Timestamp ticks per second.
    pub time_scale: f64,
}

impl SurfaceParams {
    /// Side length of the surface, `2R + 1`.
    #[inline]
    #[must_use]
    pub fn side(&self) -> usize {
        2 * usize::from(self.radius) + 1
    }

    /// Decay weight of an event `delta_ticks` older than the trigger.
    #[inline]
    #[must_use]
    pub fn weight(&self, delta_ticks: i64) -> f64 {
        let delta = delta_ticks as f64 / self.time_scale;
        (-delta / self.tau).exp()
    }
}

impl From<&HatsConfig> for SurfaceParams {
    fn from(config: &HatsConfig) -> Self {
        Self {
            radius: config.radius,
            tau: config.tau,
            time_scale: config.time_scale,
        }
    }
}

/// Adds `value` to `cell`, clamping at `f64::MAX` instead of overflowing.
#[inline]
pub(crate) fn saturating_accumulate(cell: &mut f64, value: f64) {
    *cell = (*cell + value).min(f64::MAX);
}

/// Computes the local time surface around `trigger` from its cell memory.
///
/// The memory is expected to already contain `trigger`, which then
/// self-contributes a weight of `1.0` at the center `[R, R]`.
pub fn compute_local_surface<'a, I>(trigger: &Event, memory: I, params: &SurfaceParams) -> Array2<f64>
where
    I: IntoIterator<Item = &'a Event>,
{
    let side = params.side();
    let radius = i32::from(params.radius);
    let mut surface = Array2::<f64>::zeros((side, side));

    for event in memory {
        let dx = i32::from(event.x) - i32::from(trigger.x);
        let dy = i32::from(event.y) - i32::from(trigger.y);
        if dx.abs() > radius || dy.abs() > radius {
            continue;
        }

        let weight = params.weight(trigger.t - event.t);
        let row = (dy + radius).unsigned_abs() as usize;
        let col = (dx + radius).unsigned_abs() as usize;
        saturating_accumulate(&mut surface[[row, col]], weight);
    }

    surface
}
