//! Per-cell, per-polarity temporal memory.
//!
//! Each (cell, polarity) lane is a time-ordered queue of events, oldest
//! first. Events arrive with non-decreasing timestamps, so insertion is an
//! append and eviction trims a prefix located by binary search.

use hats_core::{Event, Polarity};
use std::collections::VecDeque;

/// Event memory of a single cell, one lane per polarity.
#[derive(Debug, Clone, Default)]
pub struct CellMemory {
    lanes: [VecDeque<Event>; Polarity::COUNT],
}

impl CellMemory {
    /// Creates an empty cell memory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event to its polarity lane.
    #[inline]
    pub fn insert(&mut self, polarity: Polarity, event: Event) {
        self.lanes[polarity.index()].push_back(event);
    }

    /// Removes every event older than `cutoff` and returns how many were dropped.
    ///
    /// The lane is time-ordered, so the expired events form a prefix whose end
    /// is found with `partition_point`: O(log n + k) for k removed events.
    pub fn evict_older_than(&mut self, polarity: Polarity, cutoff: i64) -> usize {
        let lane = &mut self.lanes[polarity.index()];
        let expired = lane.partition_point(|event| event.t < cutoff);
        lane.drain(..expired);
        expired
    }

    /// Evicts events that fell out of `window` relative to the lane's newest event.
    pub fn evict_expired(&mut self, polarity: Polarity, window: i64) -> usize {
        match self.latest(polarity) {
            Some(latest) => self.evict_older_than(polarity, latest.saturating_sub(window)),
            None => 0,
        }
    }

    /// Timestamp of the newest event in a lane.
    #[inline]
    #[must_use]
    pub fn latest(&self, polarity: Polarity) -> Option<i64> {
        self.lanes[polarity.index()].back().map(|event| event.t)
    }

    /// Retained events of a lane, oldest first.
    pub fn snapshot(&self, polarity: Polarity) -> impl ExactSizeIterator<Item = &Event> + '_ {
        self.lanes[polarity.index()].iter()
    }

    /// Number of events retained in a lane.
    #[must_use]
    pub fn len(&self, polarity: Polarity) -> usize {
        self.lanes[polarity.index()].len()
    }

    /// Returns true if both lanes are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.iter().all(VecDeque::is_empty)
    }

    /// Drops every retained event.
    pub fn clear(&mut self) {
        for lane in &mut self.lanes {
            lane.clear();
        }
    }
}

/// Temporal memory for every cell of the sensor.
#[derive(Debug, Clone)]
pub struct TemporalMemory {
    window: i64,
    cells: Vec<CellMemory>,
}

impl TemporalMemory {
    /// Creates memory for `n_cells` cells retaining events up to `window` old.
    #[must_use]
    pub fn new(n_cells: usize, window: i64) -> Self {
        Self {
            window,
            cells: vec![CellMemory::new(); n_cells],
        }
    }

    /// Appends an event to a cell lane.
    ///
    /// # Panics
    /// Panics if `cell` is out of range.
    pub fn insert(&mut self, cell: usize, polarity: Polarity, event: Event) {
        self.cells[cell].insert(polarity, event);
    }

    /// Removes the events of a lane older than `cutoff`.
    ///
    /// # Panics
    /// Panics if `cell` is out of range.
    pub fn evict_older_than(&mut self, cell: usize, polarity: Polarity, cutoff: i64) -> usize {
        self.cells[cell].evict_older_than(polarity, cutoff)
    }

    /// Removes the events of a lane older than its newest event minus the window.
    ///
    /// # Panics
    /// Panics if `cell` is out of range.
    pub fn evict_expired(&mut self, cell: usize, polarity: Polarity) -> usize {
        self.cells[cell].evict_expired(polarity, self.window)
    }

    /// Retained events of a lane, oldest first.
    ///
    /// # Panics
    /// Panics if `cell` is out of range.
    pub fn snapshot(
        &self,
        cell: usize,
        polarity: Polarity,
    ) -> impl ExactSizeIterator<Item = &Event> + '_ {
        self.cells[cell].snapshot(polarity)
    }

    /// Timestamp of the newest event in a lane.
    #[must_use]
    pub fn latest(&self, cell: usize, polarity: Polarity) -> Option<i64> {
        self.cells.get(cell).and_then(|memory| memory.latest(polarity))
    }

    /// Number of events retained in a lane.
    #[must_use]
    pub fn len(&self, cell: usize, polarity: Polarity) -> usize {
        self.cells.get(cell).map_or(0, |memory| memory.len(polarity))
    }

    /// Number of events retained across all cells and polarities.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.cells
            .iter()
            .map(|memory| Polarity::ALL.iter().map(|&p| memory.len(p)).sum::<usize>())
            .sum()
    }

    /// Temporal window in timestamp ticks.
    #[must_use]
    pub fn window(&self) -> i64 {
        self.window
    }

    /// Number of cells.
    #[must_use]
    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    /// Per-cell memories, for cell-partitioned processing.
    pub(crate) fn cells_mut(&mut self) -> &mut [CellMemory] {
        &mut self.cells
    }

    /// Per-cell memory of one cell.
    pub(crate) fn cell_mut(&mut self, cell: usize) -> &mut CellMemory {
        &mut self.cells[cell]
    }

    /// Drops every retained event.
    pub fn clear(&mut self) {
        for memory in &mut self.cells {
            memory.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on(t: i64) -> Event {
        Event::new(1, 1, t, true)
    }

    #[test]
    fn test_insert_and_snapshot_order() {
        let mut memory = TemporalMemory::new(4, 1_000);
        for t in [10, 20, 20, 30] {
            memory.insert(2, Polarity::On, on(t));
        }

        let times: Vec<i64> = memory.snapshot(2, Polarity::On).map(|e| e.t).collect();
        assert_eq!(times, vec![10, 20, 20, 30]);
        assert_eq!(memory.len(2, Polarity::Off), 0);
        assert_eq!(memory.latest(2, Polarity::On), Some(30));
        assert_eq!(memory.total_len(), 4);
    }

    #[test]
    fn test_evict_older_than_trims_prefix() {
        let mut memory = CellMemory::new();
        for t in [100, 200, 300, 400, 500] {
            memory.insert(Polarity::On, on(t));
        }

        assert_eq!(memory.evict_older_than(Polarity::On, 300), 2);
        let times: Vec<i64> = memory.snapshot(Polarity::On).map(|e| e.t).collect();
        assert_eq!(times, vec![300, 400, 500]);

        // Nothing left to evict below the same cutoff.
        assert_eq!(memory.evict_older_than(Polarity::On, 300), 0);
    }

    #[test]
    fn test_evict_empty_lane() {
        let mut memory = TemporalMemory::new(1, 50);
        assert_eq!(memory.evict_expired(0, Polarity::Off), 0);
        assert_eq!(memory.evict_older_than(0, Polarity::Off, i64::MAX), 0);
        assert_eq!(memory.latest(0, Polarity::Off), None);
    }

    #[test]
    fn test_evict_expired_keeps_window_boundary() {
        let mut memory = TemporalMemory::new(1, 100);
        for t in [0, 50, 99, 100, 150, 200] {
            memory.insert(0, Polarity::On, on(t));
        }

        // Cutoff = 200 - 100 = 100; an event exactly at the cutoff stays.
        assert_eq!(memory.evict_expired(0, Polarity::On), 3);
        let times: Vec<i64> = memory.snapshot(0, Polarity::On).map(|e| e.t).collect();
        assert_eq!(times, vec![100, 150, 200]);
    }

    #[test]
    fn test_eviction_invariant_over_stream() {
        let window = 250;
        let mut memory = TemporalMemory::new(1, window);
        let mut t = 0i64;
        for step in 0..2_000i64 {
            t += step % 7; // Non-decreasing, with repeated timestamps.
            memory.insert(0, Polarity::Off, Event::new(0, 0, t, false));
            memory.evict_expired(0, Polarity::Off);

            let latest = memory.latest(0, Polarity::Off).unwrap();
            assert!(memory
                .snapshot(0, Polarity::Off)
                .all(|event| event.t >= latest - window));
        }
    }

    #[test]
    fn test_lanes_are_independent() {
        let mut memory = CellMemory::new();
        memory.insert(Polarity::On, on(10));
        memory.insert(Polarity::Off, Event::new(1, 1, 1_000, false));

        assert_eq!(memory.evict_expired(Polarity::Off, 10), 0);
        assert_eq!(memory.len(Polarity::On), 1);

        memory.clear();
        assert!(memory.is_empty());
    }
}
