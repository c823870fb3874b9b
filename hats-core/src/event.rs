//! Event types for event-based vision sensors.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Sign of the brightness change that triggered an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Polarity {
    /// Brightness decrease.
    Off,
    /// Brightness increase.
    On,
}

impl Polarity {
    /// Both polarities, in lane order.
    pub const ALL: [Polarity; 2] = [Polarity::Off, Polarity::On];

    /// Number of polarity lanes kept per cell.
    pub const COUNT: usize = 2;

    /// Lane index used for per-cell storage (`Off` = 0, `On` = 1).
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Polarity::Off => 0,
            Polarity::On => 1,
        }
    }

    /// Returns the polarity matching a boolean sensor flag.
    #[inline]
    #[must_use]
    pub fn from_flag(on: bool) -> Self {
        if on {
            Polarity::On
        } else {
            Polarity::Off
        }
    }
}

impl From<bool> for Polarity {
    fn from(on: bool) -> Self {
        Self::from_flag(on)
    }
}

/// A single brightness-change event.
///
/// Timestamps are in microseconds and are expected to be non-decreasing
/// across the stream delivered by the event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Event {
    /// Pixel column.
    pub x: u16,
    /// Pixel row.
    pub y: u16,
    /// Timestamp in microseconds.
    pub t: i64,
    /// `true` for an "on" (brightness increase) event.
    pub polarity: bool,
}

impl Event {
    /// Creates a new event.
    #[inline]
    #[must_use]
    pub fn new(x: u16, y: u16, t: i64, polarity: bool) -> Self {
        Self { x, y, t, polarity }
    }

    /// Returns the polarity lane of this event.
    #[inline]
    #[must_use]
    pub fn polarity(&self) -> Polarity {
        Polarity::from_flag(self.polarity)
    }
}
