//! Fleet directory errors

use thiserror::Error;

use core_kernel::Odometer;

/// Errors raised when building or editing fleet records
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FleetError {
    #[error("Invalid license plate: {0:?}")]
    InvalidLicensePlate(String),

    #[error("Driver name cannot be empty")]
    EmptyDriverName,

    #[error("Odometer cannot go backwards from {current} to {requested}")]
    OdometerRollback {
        current: Odometer,
        requested: Odometer,
    },

    #[error("Unknown car status: {0}")]
    UnknownStatus(String),
}
