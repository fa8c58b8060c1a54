//! Odometer plausibility policy
//!
//! Every new reading is checked against a baseline: the car's last known
//! odometer at checkout, the checkout reading at check-in. A reading below the
//! baseline is invalid; a reading more than `max_delta` above it is rejected as
//! implausible. A reading exactly at the ceiling is accepted.

use serde::{Deserialize, Serialize};

use core_kernel::Odometer;
use crate::error::UsageError;

/// Default maximum jump between consecutive readings
pub const DEFAULT_MAX_ODOMETER_DELTA: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OdometerPolicy {
    max_delta: u64,
}

impl Default for OdometerPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ODOMETER_DELTA)
    }
}

impl OdometerPolicy {
    pub fn new(max_delta: u64) -> Self {
        Self { max_delta }
    }

    pub fn max_delta(&self) -> u64 {
        self.max_delta
    }

    /// Highest reading accepted after `baseline`
    pub fn ceiling(&self, baseline: Odometer) -> Odometer {
        baseline.saturating_add(self.max_delta)
    }

    /// Validates a raw reading against `baseline`
    ///
    /// # Errors
    ///
    /// * `InvalidOdometer` if the reading is negative or below `baseline`
    /// * `OdometerTooHigh` if the reading is above [`Self::ceiling`]
    pub fn check_reading(&self, raw: i64, baseline: Odometer) -> Result<Odometer, UsageError> {
        let reading = Odometer::from_raw(raw)
            .map_err(|e| UsageError::invalid_odometer(raw, e.to_string()))?;

        if reading < baseline {
            return Err(UsageError::invalid_odometer(
                raw,
                format!("below last recorded reading {}", baseline),
            ));
        }

        let ceiling = self.ceiling(baseline);
        if reading > ceiling {
            return Err(UsageError::OdometerTooHigh { reading, ceiling });
        }

        Ok(reading)
    }
}
