//! Usage event record
//!
//! A usage event is one checkout of a car by a driver. It is created OPEN and
//! closed exactly once. A closed event is permanent history: it is neither
//! changed nor deleted.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{CarId, DriverId, ManagerId, Odometer, UsageEventId};
use crate::error::UsageError;

/// Lifecycle state of a usage event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Checkout in progress
    Open,
    /// Checked back in; immutable history
    Closed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Open => "open",
            EventStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(EventStatus::Open),
            "closed" => Ok(EventStatus::Closed),
            other => Err(format!("unknown event status: {other}")),
        }
    }
}

/// One checkout interval of a car
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEvent {
    pub id: UsageEventId,
    pub car_id: CarId,
    pub driver_id: DriverId,
    /// Operator who recorded the checkout
    pub manager_id: ManagerId,
    /// Reading at checkout
    pub odometer: Odometer,
    /// Reading at check-in
    pub final_odometer: Option<Odometer>,
    pub status: EventStatus,
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UsageEvent {
    /// Starts a checkout now
    pub fn open(car_id: CarId, driver_id: DriverId, manager_id: ManagerId, odometer: Odometer) -> Self {
        let now = Utc::now();
        Self {
            id: UsageEventId::new_v7(),
            car_id,
            driver_id,
            manager_id,
            odometer,
            final_odometer: None,
            status: EventStatus::Open,
            start_at: now,
            end_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == EventStatus::Open
    }

    pub fn is_closed(&self) -> bool {
        self.status == EventStatus::Closed
    }

    /// Checks the car back in
    ///
    /// # Errors
    ///
    /// * `InvalidEventStatus` if the event is already closed
    /// * `InvalidOdometer` if `final_odometer` is below the checkout reading
    pub fn close(&mut self, final_odometer: Odometer) -> Result<(), UsageError> {
        if !self.is_open() {
            return Err(UsageError::InvalidEventStatus {
                id: self.id,
                status: self.status,
            });
        }
        if final_odometer < self.odometer {
            return Err(UsageError::invalid_odometer(
                final_odometer.to_i64().unwrap_or(i64::MAX),
                format!("below checkout reading {}", self.odometer),
            ));
        }

        let now = Utc::now();
        self.status = EventStatus::Closed;
        self.final_odometer = Some(final_odometer);
        self.end_at = Some(now.max(self.start_at));
        self.updated_at = now;
        Ok(())
    }

    /// Distance driven, known once the event is closed
    pub fn distance(&self) -> Option<u64> {
        self.final_odometer
            .and_then(|end| end.distance_since(self.odometer))
    }
}
