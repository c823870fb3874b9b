//! Running counter of positive ("on") events.
//!
//! Logs a progress line every `print_interval` positive events.

use hats_core::{Error, Event, Result};
use log::info;

/// Default number of positive events between progress lines.
pub const DEFAULT_PRINT_INTERVAL: u64 = 10_000;

/// Counts positive events across batches.
#[derive(Debug, Clone)]
pub struct PositiveEventCounter {
    print_interval: u64,
    count: u64,
}

impl Default for PositiveEventCounter {
    fn default() -> Self {
        Self {
            print_interval: DEFAULT_PRINT_INTERVAL,
            count: 0,
        }
    }
}

impl PositiveEventCounter {
    /// Creates a counter logging every `print_interval` positive events.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if `print_interval` is zero.
    pub fn new(print_interval: u64) -> Result<Self> {
        if print_interval == 0 {
            return Err(Error::invalid_config(
                "print_interval",
                print_interval,
                "must be at least 1",
            ));
        }
        Ok(Self {
            print_interval,
            count: 0,
        })
    }

    /// Counts the positive events of a batch; returns how many progress lines were emitted.
    pub fn accept(&mut self, events: &[Event]) -> usize {
        let mut milestones = 0;
        for _ in events.iter().filter(|event| event.polarity) {
            self.count += 1;
            if self.count % self.print_interval == 0 {
                info!("Processed {} positive events", self.count);
                milestones += 1;
            }
        }
        milestones
    }

    /// Positive events counted so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Number of positive events between progress lines.
    #[must_use]
    pub fn print_interval(&self) -> u64 {
        self.print_interval
    }

    /// Restarts the count.
    pub fn reset(&mut self) {
        self.count = 0;
    }
}
