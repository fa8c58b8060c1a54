//! Car records
//!
//! The car directory owns these records. The usage engine only reads them and
//! flips `status`/`odometer` through the directory port.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{CarId, Odometer};
use crate::error::FleetError;

/// Operational status of a car
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarStatus {
    /// Parked and free to be checked out
    Available,
    /// Checked out by a driver; an open usage event exists
    InUse,
    /// Withdrawn for servicing
    InMaintenance,
}

impl CarStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CarStatus::Available => "available",
            CarStatus::InUse => "in_use",
            CarStatus::InMaintenance => "in_maintenance",
        }
    }
}

impl fmt::Display for CarStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CarStatus {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(CarStatus::Available),
            "in_use" => Ok(CarStatus::InUse),
            "in_maintenance" => Ok(CarStatus::InMaintenance),
            other => Err(FleetError::UnknownStatus(other.to_string())),
        }
    }
}

/// A vehicle in the fleet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Car {
    pub id: CarId,
    /// Unique, stored upper-cased without surrounding whitespace
    pub license_plate: String,
    pub model: Option<String>,
    /// Last known reading; never decreases
    pub odometer: Odometer,
    pub status: CarStatus,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Car {
    /// Creates an active, available car
    pub fn new(license_plate: &str, odometer: Odometer) -> Result<Self, FleetError> {
        let now = Utc::now();
        Ok(Self {
            id: CarId::new_v7(),
            license_plate: normalize_license_plate(license_plate)?,
            model: None,
            odometer,
            status: CarStatus::Available,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn is_available(&self) -> bool {
        self.status == CarStatus::Available
    }

    pub fn is_in_use(&self) -> bool {
        self.status == CarStatus::InUse
    }

    pub fn set_status(&mut self, status: CarStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Moves the odometer forward
    ///
    /// Setting the current value again is a no-op; going backwards is refused.
    pub fn advance_odometer(&mut self, reading: Odometer) -> Result<(), FleetError> {
        if reading < self.odometer {
            return Err(FleetError::OdometerRollback {
                current: self.odometer,
                requested: reading,
            });
        }
        self.odometer = reading;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Canonical form of a license plate
pub fn normalize_license_plate(raw: &str) -> Result<String, FleetError> {
    let plate = raw.trim().to_uppercase();
    if plate.is_empty() || !plate.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == ' ') {
        return Err(FleetError::InvalidLicensePlate(raw.to_string()));
    }
    Ok(plate)
}
