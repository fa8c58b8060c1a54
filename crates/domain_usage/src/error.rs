//! Usage domain errors

use thiserror::Error;

use core_kernel::{CarId, DriverId, Odometer, PortError, UsageEventId};
use crate::event::EventStatus;

/// Errors returned by the event lifecycle engine
///
/// The first seven variants are precondition failures: the command was
/// rejected and nothing was changed. `InvariantViolated` means stored data is
/// inconsistent and needs operator attention. `Port` wraps a collaborator
/// failure.
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("Car not found or inactive: {0}")]
    CarNotFound(CarId),

    #[error("Driver not found or inactive: {0}")]
    DriverNotFound(DriverId),

    #[error("Car {0} is not available")]
    CarInUse(CarId),

    #[error("Invalid odometer reading {reading}: {reason}")]
    InvalidOdometer { reading: i64, reason: String },

    #[error("Odometer reading {reading} exceeds the plausible maximum {ceiling}")]
    OdometerTooHigh { reading: Odometer, ceiling: Odometer },

    #[error("Usage event not found: {0}")]
    EventNotFound(UsageEventId),

    #[error("Usage event {id} is {status}")]
    InvalidEventStatus { id: UsageEventId, status: EventStatus },

    #[error("Usage invariant violated: {0}")]
    InvariantViolated(String),

    #[error(transparent)]
    Port(PortError),
}

impl UsageError {
    pub fn invalid_odometer(reading: i64, reason: impl Into<String>) -> Self {
        UsageError::InvalidOdometer {
            reading,
            reason: reason.into(),
        }
    }

    /// True when the command was rejected before any state changed
    pub fn is_precondition_failure(&self) -> bool {
        !matches!(self, UsageError::InvariantViolated(_) | UsageError::Port(_))
    }

    /// True when retrying the same command later may succeed
    pub fn is_retriable(&self) -> bool {
        match self {
            UsageError::CarInUse(_) => true,
            UsageError::Port(e) => e.is_transient(),
            _ => false,
        }
    }
}

impl From<PortError> for UsageError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::InvariantViolation { message } => UsageError::InvariantViolated(message),
            other => UsageError::Port(other),
        }
    }
}
