//! Ingestion reports and cumulative statistics.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Outcome of ingesting one batch of events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IngestReport {
    /// Events that reached the accumulator.
    pub processed: usize,
    /// "On" events among the processed ones.
    pub on_events: usize,
    /// "Off" events among the processed ones.
    pub off_events: usize,
    /// Events discarded because they lie outside the sensor.
    pub out_of_bounds: usize,
    /// Events discarded because they are older than their cell's newest event.
    pub out_of_order: usize,
    /// Events evicted from temporal memory while processing the batch.
    pub evicted: usize,
    /// Timestamp of the newest processed event.
    pub latest_timestamp: Option<i64>,
}

impl IngestReport {
    /// Total number of events discarded.
    #[must_use]
    pub fn discarded(&self) -> usize {
        self.out_of_bounds + self.out_of_order
    }

    /// Total number of events seen, processed or not.
    #[must_use]
    pub fn total(&self) -> usize {
        self.processed + self.discarded()
    }
}

impl AddAssign for IngestReport {
    fn add_assign(&mut self, other: Self) {
        self.processed += other.processed;
        self.on_events += other.on_events;
        self.off_events += other.off_events;
        self.out_of_bounds += other.out_of_bounds;
        self.out_of_order += other.out_of_order;
        self.evicted += other.evicted;
        self.latest_timestamp = match (self.latest_timestamp, other.latest_timestamp) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }
}

/// Statistics accumulated over the lifetime of an engine (until reset).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IngestStatistics {
    /// Number of batches ingested.
    pub batches: usize,
    /// Sum of all batch reports.
    pub totals: IngestReport,
}

impl IngestStatistics {
    /// Folds a batch report into the running totals.
    pub fn record(&mut self, report: &IngestReport) {
        self.batches += 1;
        self.totals += *report;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_totals() {
        let report = IngestReport {
            processed: 10,
            on_events: 6,
            off_events: 4,
            out_of_bounds: 2,
            out_of_order: 1,
            evicted: 3,
            latest_timestamp: Some(42),
        };
        assert_eq!(report.discarded(), 3);
        assert_eq!(report.total(), 13);
    }

    #[test]
    fn test_report_add_assign() {
        let mut total = IngestReport::default();
        total += IngestReport {
            processed: 2,
            on_events: 2,
            latest_timestamp: Some(700),
            ..Default::default()
        };
        total += IngestReport {
            processed: 1,
            off_events: 1,
            out_of_bounds: 4,
            ..Default::default()
        };
        total += IngestReport {
            processed: 1,
            off_events: 1,
            latest_timestamp: Some(300),
            ..Default::default()
        };
        assert_eq!(total.processed, 4);
        assert_eq!(total.on_events, 2);
        assert_eq!(total.off_events, 2);
        assert_eq!(total.out_of_bounds, 4);
        assert_eq!(total.latest_timestamp, Some(700));
    }

    #[test]
    fn test_statistics_record() {
        let mut stats = IngestStatistics::default();
        let report = |latest| IngestReport {
            processed: 5,
            latest_timestamp: latest,
            ..Default::default()
        };
        stats.record(&report(Some(1_000)));
        stats.record(&report(None));
        stats.record(&report(Some(500)));

        assert_eq!(stats.batches, 3);
        assert_eq!(stats.totals.processed, 15);
        assert_eq!(stats.totals.latest_timestamp, Some(1_000));
    }

    #[test]
    #[cfg(feature = "serde")]
    fn test_statistics_json() {
        let mut stats = IngestStatistics::default();
        stats.record(&IngestReport {
            processed: 3,
            on_events: 2,
            off_events: 1,
            latest_timestamp: Some(250),
            ..Default::default()
        });

        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"batches\":1"));
        let back: IngestStatistics = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stats);
    }
}
