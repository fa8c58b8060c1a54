//! Driver records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::DriverId;
use crate::error::FleetError;

/// A person allowed to check out cars
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    pub id: DriverId,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Driver {
    /// Creates an active driver
    pub fn new(name: impl Into<String>) -> Result<Self, FleetError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(FleetError::EmptyDriverName);
        }
        let now = Utc::now();
        Ok(Self {
            id: DriverId::new_v7(),
            name: name.trim().to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn set_active(&mut self, is_active: bool) {
        self.is_active = is_active;
        self.updated_at = Utc::now();
    }
}
