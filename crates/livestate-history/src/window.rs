use crate::error::{HistoryError, Result};
use chrono::{DateTime, Utc};

/// Half-open query interval `[start, end)` in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    start: i64,
    end: i64,
}

impl TimeWindow {
    pub fn new(start: i64, end: i64) -> Result<Self> {
        if start >= end || end.checked_sub(start).is_none() {
            return Err(HistoryError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        Self::new(start.timestamp(), end.timestamp())
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    /// Length in seconds, always positive.
    pub fn duration(&self) -> i64 {
        self.end - self.start
    }

    pub fn contains(&self, time: i64) -> bool {
        (self.start..self.end).contains(&time)
    }

    /// Fraction of the window covered by `duration` seconds.
    pub fn fraction(&self, duration: i64) -> f64 {
        duration as f64 / self.duration() as f64
    }
}
