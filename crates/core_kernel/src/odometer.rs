//! Odometer readings
//!
//! An odometer reading is a whole number of distance units (kilometres in the
//! default deployment). Readings are never negative; callers that receive raw
//! signed input go through [`Odometer::from_raw`].

use std::fmt;
use std::ops::Sub;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when building an odometer reading
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OdometerError {
    #[error("Odometer reading cannot be negative: {0}")]
    Negative(i64),

    #[error("Odometer reading {0} is out of range")]
    OutOfRange(u64),
}

/// A non-negative odometer reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Odometer(u64);

impl Odometer {
    pub const ZERO: Odometer = Odometer(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Validates a raw signed reading
    pub fn from_raw(raw: i64) -> Result<Self, OdometerError> {
        u64::try_from(raw)
            .map(Self)
            .map_err(|_| OdometerError::Negative(raw))
    }

    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Converts to the signed representation used by SQL columns
    pub fn to_i64(self) -> Result<i64, OdometerError> {
        i64::try_from(self.0).map_err(|_| OdometerError::OutOfRange(self.0))
    }

    /// Distance from `earlier` to `self`, or None if `earlier` is ahead
    pub fn distance_since(&self, earlier: Odometer) -> Option<u64> {
        self.0.checked_sub(earlier.0)
    }

    /// Adds a delta without wrapping past `u64::MAX`
    pub fn saturating_add(&self, delta: u64) -> Odometer {
        Odometer(self.0.saturating_add(delta))
    }
}

impl fmt::Display for Odometer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Odometer {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl TryFrom<i64> for Odometer {
    type Error = OdometerError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        Self::from_raw(raw)
    }
}

impl Sub for Odometer {
    type Output = Option<u64>;

    fn sub(self, rhs: Odometer) -> Self::Output {
        self.distance_since(rhs)
    }
}
