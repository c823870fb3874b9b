//! HATS encoding engine.
//!
//! Wires the cell lookup, temporal memory, local surface computation and
//! rolling accumulator together behind a batch ingestion entry point.
//!
//! Per event:
//! 1. Resolve the cell; events outside the sensor are counted and skipped.
//! 2. Append the event to its (cell, polarity) memory and evict expired events.
//! 3. Compute the local surface around the event from that memory.
//! 4. Push the surface into the (cell, polarity) rolling histogram.

use crate::accumulator::{CellHistograms, HatsAccumulator};
use crate::compositor;
use crate::lookup::CellLookup;
use crate::memory::{CellMemory, TemporalMemory};
use crate::surface::{compute_local_surface, SurfaceParams};
use hats_core::{Event, HatsConfig, IngestReport, IngestStatistics, Polarity, Result};
use log::{debug, info, warn};
use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

/// Event-to-surface encoding engine for one sensor.
#[derive(Debug, Clone)]
pub struct HatsEngine {
    config: HatsConfig,
    params: SurfaceParams,
    lookup: CellLookup,
    memory: TemporalMemory,
    accumulator: HatsAccumulator,
    statistics: IngestStatistics,
}

impl HatsEngine {
    /// Validates `config` and allocates state for a `width x height` sensor.
    ///
    /// # Errors
    /// Returns an error if the configuration is out of range or the geometry is empty.
    pub fn setup(width: u32, height: u32, config: HatsConfig) -> Result<Self> {
        config.validate()?;

        let lookup = CellLookup::new(width, height, u32::from(config.cell_size))?;
        let n_cells = lookup.n_cells();
        let memory = TemporalMemory::new(n_cells, config.temporal_window_us);
        let accumulator = HatsAccumulator::new(n_cells, config.surface_side(), config.window_size);

        info!(
            "HATS engine: {}x{} sensor, {} cells ({}x{}), R={}, window={}",
            width,
            height,
            n_cells,
            lookup.grid_cols(),
            lookup.grid_rows(),
            config.radius,
            config.window_size
        );

        Ok(Self {
            params: SurfaceParams::from(&config),
            config,
            lookup,
            memory,
            accumulator,
            statistics: IngestStatistics::default(),
        })
    }

    /// Processes a batch of events in arrival order.
    ///
    /// Malformed events never abort the batch: events outside the sensor and
    /// events older than their lane's newest event are discarded and counted.
    pub fn ingest(&mut self, events: &[Event]) -> IngestReport {
        let report = if self.config.parallel {
            self.ingest_parallel(events)
        } else {
            self.ingest_sequential(events)
        };

        if report.out_of_order > 0 {
            warn!(
                "discarded {} out-of-order events (source timestamps must be non-decreasing)",
                report.out_of_order
            );
        }
        debug!(
            "ingested {} events: {} processed, {} out of bounds, {} evicted",
            events.len(),
            report.processed,
            report.out_of_bounds,
            report.evicted
        );

        self.statistics.record(&report);
        report
    }

    fn ingest_sequential(&mut self, events: &[Event]) -> IngestReport {
        let mut report = IngestReport::default();
        let window = self.memory.window();

        for event in events {
            let Some(cell) = self.lookup.cell_index(event.x, event.y) else {
                debug!("event at ({}, {}) outside sensor, skipped", event.x, event.y);
                report.out_of_bounds += 1;
                continue;
            };
            process_event(
                self.memory.cell_mut(cell),
                self.accumulator.cell_mut(cell),
                event,
                window,
                &self.params,
                &mut report,
            );
        }

        report
    }

    /// Buckets events by cell (keeping arrival order within a cell) and
    /// processes the cells concurrently; each cell is owned by one worker.
    fn ingest_parallel(&mut self, events: &[Event]) -> IngestReport {
        let mut report = IngestReport::default();
        let mut buckets: Vec<Vec<Event>> = vec![Vec::new(); self.lookup.n_cells()];

        for event in events {
            match self.lookup.cell_index(event.x, event.y) {
                Some(cell) => buckets[cell].push(*event),
                None => {
                    debug!("event at ({}, {}) outside sensor, skipped", event.x, event.y);
                    report.out_of_bounds += 1;
                }
            }
        }

        let window = self.memory.window();
        let params = self.params;

        let cell_reports = self
            .memory
            .cells_mut()
            .par_iter_mut()
            .zip(self.accumulator.cells_mut().par_iter_mut())
            .zip(buckets.par_iter())
            .filter(|(_, bucket)| !bucket.is_empty())
            .map(|((memory, histograms), bucket)| {
                let mut cell_report = IngestReport::default();
                for event in bucket {
                    process_event(memory, histograms, event, window, &params, &mut cell_report);
                }
                cell_report
            })
            .reduce(IngestReport::default, |mut a, b| {
                a += b;
                a
            });

        report += cell_reports;
        report
    }

    /// Tiles the running sums of `polarity` into one frame.
    ///
    /// # Errors
    /// Returns an error if the accumulator layout is inconsistent with the grid.
    pub fn composite(&self, polarity: Polarity) -> Result<Array2<f64>> {
        compositor::composite(
            &self.accumulator,
            self.lookup.grid_cols(),
            self.lookup.grid_rows(),
            self.config.surface_side(),
            polarity,
        )
    }

    /// Tiles the normalized sums of `polarity` into one frame.
    ///
    /// # Errors
    /// Returns an error if the accumulator layout is inconsistent with the grid.
    pub fn composite_normalized(&self, polarity: Polarity, epsilon: f64) -> Result<Array2<f64>> {
        compositor::composite_normalized(
            &self.accumulator,
            self.lookup.grid_cols(),
            self.lookup.grid_rows(),
            self.config.surface_side(),
            polarity,
            epsilon,
        )
    }

    /// Running sum of one (cell, polarity).
    ///
    /// # Panics
    /// Panics if `cell` is out of range.
    #[must_use]
    pub fn sum(&self, cell: usize, polarity: Polarity) -> ArrayView2<'_, f64> {
        self.accumulator.sum(cell, polarity)
    }

    /// Clears all temporal memory, accumulators and statistics.
    pub fn reset(&mut self) {
        self.memory.clear();
        self.accumulator.clear();
        self.statistics = IngestStatistics::default();
        info!("HATS engine reset");
    }

    /// Applies a new configuration, rebuilding state for the same sensor.
    ///
    /// All memory and accumulators are cleared.
    ///
    /// # Errors
    /// Returns an error if the new configuration is invalid; the engine is
    /// left unchanged in that case.
    pub fn reconfigure(&mut self, config: HatsConfig) -> Result<()> {
        if config.geometry_differs(&self.config) {
            info!(
                "geometry changed: R {} -> {}, K {} -> {}",
                self.config.radius, config.radius, self.config.cell_size, config.cell_size
            );
        }
        *self = Self::setup(self.lookup.width(), self.lookup.height(), config)?;
        Ok(())
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &HatsConfig {
        &self.config
    }

    /// Local surface parameters derived from the configuration.
    #[must_use]
    pub fn surface_params(&self) -> &SurfaceParams {
        &self.params
    }

    /// Pixel to cell lookup table.
    #[must_use]
    pub fn lookup(&self) -> &CellLookup {
        &self.lookup
    }

    /// Temporal memory of every cell.
    #[must_use]
    pub fn memory(&self) -> &TemporalMemory {
        &self.memory
    }

    /// Rolling accumulators of every cell.
    #[must_use]
    pub fn accumulator(&self) -> &HatsAccumulator {
        &self.accumulator
    }

    /// Totals since setup or the last reset.
    #[must_use]
    pub fn statistics(&self) -> &IngestStatistics {
        &self.statistics
    }
}

/// Runs one event through memory, surface computation and accumulation.
fn process_event(
    memory: &mut CellMemory,
    histograms: &mut CellHistograms,
    event: &Event,
    window: i64,
    params: &SurfaceParams,
    report: &mut IngestReport,
) {
    let polarity = event.polarity();

    if memory.latest(polarity).is_some_and(|latest| event.t < latest) {
        debug!(
            "event at ({}, {}) t={} older than its cell memory, skipped",
            event.x, event.y, event.t
        );
        report.out_of_order += 1;
        return;
    }

    memory.insert(polarity, *event);
    report.evicted += memory.evict_expired(polarity, window);

    let surface = compute_local_surface(event, memory.snapshot(polarity), params);
    histograms.push(polarity, surface);

    report.processed += 1;
    match polarity {
        Polarity::On => report.on_events += 1,
        Polarity::Off => report.off_events += 1,
    }
    report.latest_timestamp = Some(report.latest_timestamp.map_or(event.t, |t| t.max(event.t)));
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use hats_core::Error;

    fn small_config() -> HatsConfig {
        HatsConfig::new()
            .with_radius(2)
            .with_cell_size(4)
            .with_temporal_window_us(1_000)
            .with_window_size(5)
    }

    #[test]
    fn test_setup_rejects_invalid_config() {
        let result = HatsEngine::setup(64, 64, HatsConfig::new().with_radius(64));
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));

        let result = HatsEngine::setup(0, 64, HatsConfig::new());
        assert!(matches!(result, Err(Error::InvalidGeometry { .. })));

        let result = HatsEngine::setup(u32::MAX, u32::MAX, HatsConfig::new());
        assert!(matches!(result, Err(Error::InvalidGeometry { .. })));
    }

    #[test]
    fn test_single_event_self_weight() {
        let mut engine = HatsEngine::setup(16, 16, small_config()).unwrap();
        let report = engine.ingest(&[Event::new(5, 6, 100, true)]);

        assert_eq!(report.processed, 1);
        assert_eq!(report.on_events, 1);
        assert_eq!(report.latest_timestamp, Some(100));

        let cell = engine.lookup().cell_index(5, 6).unwrap();
        let sum = engine.sum(cell, Polarity::On);
        assert_eq!(sum[[2, 2]], 1.0);
        assert_eq!(sum.sum(), 1.0);
        assert_eq!(engine.sum(cell, Polarity::Off).sum(), 0.0);
    }

    #[test]
    fn test_out_of_bounds_events_skipped() {
        let mut engine = HatsEngine::setup(16, 16, small_config()).unwrap();
        let events = [
            Event::new(1, 1, 0, true),
            Event::new(16, 0, 1, true),
            Event::new(0, 200, 2, false),
            Event::new(2, 2, 3, true),
        ];
        let report = engine.ingest(&events);

        assert_eq!(report.processed, 2);
        assert_eq!(report.out_of_bounds, 2);
        assert_eq!(engine.statistics().totals.out_of_bounds, 2);
    }

    #[test]
    fn test_out_of_order_events_skipped() {
        let mut engine = HatsEngine::setup(16, 16, small_config()).unwrap();
        let events = [
            Event::new(1, 1, 500, true),
            Event::new(1, 2, 400, true), // same cell and polarity, older
            Event::new(1, 2, 400, false), // other lane, accepted
        ];
        let report = engine.ingest(&events);

        assert_eq!(report.processed, 2);
        assert_eq!(report.out_of_order, 1);
        assert_eq!(engine.memory().len(0, Polarity::On), 1);
    }

    #[test]
    fn test_memory_eviction_during_ingest() {
        let mut engine = HatsEngine::setup(16, 16, small_config()).unwrap();
        let events: Vec<Event> = (0..10).map(|i| Event::new(1, 1, i * 400, false)).collect();
        let report = engine.ingest(&events);

        // Window of 1000 us at 400 us spacing keeps 3 events.
        assert_eq!(engine.memory().len(0, Polarity::Off), 3);
        assert_eq!(report.evicted, 7);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut engine = HatsEngine::setup(16, 16, small_config()).unwrap();
        engine.ingest(&[Event::new(1, 1, 0, true), Event::new(9, 9, 10, false)]);
        engine.reset();

        assert_eq!(engine.memory().total_len(), 0);
        assert_eq!(engine.statistics().batches, 0);
        let frame = engine.composite(Polarity::On).unwrap();
        assert!(frame.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_reconfigure_changes_geometry() {
        let mut engine = HatsEngine::setup(16, 16, small_config()).unwrap();
        engine.ingest(&[Event::new(1, 1, 0, true)]);

        engine
            .reconfigure(small_config().with_cell_size(8).with_radius(1))
            .unwrap();
        assert_eq!(engine.lookup().n_cells(), 4);
        assert_eq!(engine.accumulator().side(), 3);
        assert_eq!(engine.memory().total_len(), 0);

        let frame = engine.composite(Polarity::On).unwrap();
        assert_eq!(frame.dim(), (6, 6));
    }

    #[test]
    fn test_reconfigure_invalid_keeps_engine() {
        let mut engine = HatsEngine::setup(16, 16, small_config()).unwrap();
        engine.ingest(&[Event::new(1, 1, 0, true)]);

        assert!(engine.reconfigure(small_config().with_tau(-1.0)).is_err());
        assert_eq!(engine.memory().total_len(), 1);
        assert_eq!(engine.config().radius, 2);
    }
}
