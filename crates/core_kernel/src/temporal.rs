//! Time periods used by usage reporting
//!
//! Usage events are half-open intervals `[start_at, end_at)`; an event still in
//! progress has no end. Reports select events whose interval overlaps a
//! [`ReportingPeriod`].

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid period: start {start} must be before end {end}")]
    InvalidPeriod {
        start: String,
        end: String,
    },

    #[error("Invalid calendar date: {0}")]
    InvalidDate(String),
}

/// A reporting window
///
/// `start` is inclusive, `end` is exclusive. A period without an end extends
/// indefinitely into the future.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingPeriod {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl ReportingPeriod {
    /// Creates a new period, rejecting empty or inverted bounds
    pub fn new(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Result<Self, TemporalError> {
        if let Some(end) = end {
            if start >= end {
                return Err(TemporalError::InvalidPeriod {
                    start: start.to_string(),
                    end: end.to_string(),
                });
            }
        }
        Ok(Self { start, end })
    }

    /// Creates an unbounded period starting at `start`
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self { start, end: None }
    }

    pub fn bounded(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TemporalError> {
        Self::new(start, Some(end))
    }

    /// Whole UTC calendar days from `first` through `last` inclusive
    pub fn days(first: NaiveDate, last: NaiveDate) -> Result<Self, TemporalError> {
        let start = first
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| TemporalError::InvalidDate(first.to_string()))?
            .and_utc();
        let end = last
            .succ_opt()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| TemporalError::InvalidDate(last.to_string()))?
            .and_utc();
        Self::bounded(start, end)
    }

    /// Everything that happened in the last `duration` up to `now`
    pub fn trailing(now: DateTime<Utc>, duration: Duration) -> Result<Self, TemporalError> {
        Self::bounded(now - duration, now)
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start && self.end.map_or(true, |e| timestamp < e)
    }

    /// Returns true if the interval `[start, end)` overlaps this period
    ///
    /// An interval with no end is treated as still running.
    pub fn overlaps_interval(&self, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> bool {
        let self_end = self.end.unwrap_or(DateTime::<Utc>::MAX_UTC);
        let other_end = end.unwrap_or(DateTime::<Utc>::MAX_UTC);

        // A zero-length interval still counts when its instant is inside the period
        if end == Some(start) {
            return self.contains(start);
        }

        start < self_end && self.start < other_end
    }

    pub fn is_unbounded(&self) -> bool {
        self.end.is_none()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.end.map(|e| e - self.start)
    }
}
