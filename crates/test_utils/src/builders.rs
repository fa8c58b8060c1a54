//! Test Data Builders
//!
//! Builders let tests set only the fields they care about. Every builder
//! produces a record that is valid on its own; `build` panics on inputs the
//! domain constructors reject.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use core_kernel::{CarId, DriverId, ManagerId, Odometer};
use domain_fleet::{Car, CarStatus, Driver};
use domain_usage::{EventStatus, UsageEvent};

static PLATE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// A plate that no other builder in this process has produced
pub fn unique_plate() -> String {
    format!("TST-{:05}", PLATE_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

/// Builder for [`Car`]
pub struct CarBuilder {
    license_plate: String,
    model: Option<String>,
    odometer: u64,
    status: CarStatus,
    is_active: bool,
}

impl Default for CarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CarBuilder {
    pub fn new() -> Self {
        Self {
            license_plate: unique_plate(),
            model: None,
            odometer: 10_000,
            status: CarStatus::Available,
            is_active: true,
        }
    }

    pub fn with_plate(mut self, plate: impl Into<String>) -> Self {
        self.license_plate = plate.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_odometer(mut self, odometer: u64) -> Self {
        self.odometer = odometer;
        self
    }

    pub fn with_status(mut self, status: CarStatus) -> Self {
        self.status = status;
        self
    }

    pub fn in_maintenance(self) -> Self {
        self.with_status(CarStatus::InMaintenance)
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn build(self) -> Car {
        let mut car = Car::new(&self.license_plate, Odometer::new(self.odometer))
            .expect("CarBuilder plate must be valid");
        car.model = self.model;
        car.status = self.status;
        car.is_active = self.is_active;
        car
    }
}

/// Builder for [`Driver`]
pub struct DriverBuilder {
    name: String,
    is_active: bool,
}

impl Default for DriverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DriverBuilder {
    pub fn new() -> Self {
        Self {
            name: "Test Driver".to_string(),
            is_active: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn build(self) -> Driver {
        let mut driver = Driver::new(self.name).expect("DriverBuilder name must not be empty");
        driver.set_active(self.is_active);
        driver
    }
}

/// Builder for historical [`UsageEvent`]s
///
/// Used to seed stores directly with events at fixed times, bypassing the
/// engine, for reporting tests.
pub struct UsageEventBuilder {
    car_id: CarId,
    driver_id: DriverId,
    manager_id: ManagerId,
    odometer: u64,
    start_at: DateTime<Utc>,
    closed: Option<(u64, Duration)>,
}

impl UsageEventBuilder {
    pub fn new(car_id: CarId, driver_id: DriverId) -> Self {
        Self {
            car_id,
            driver_id,
            manager_id: ManagerId::new(),
            odometer: 10_000,
            start_at: Utc::now(),
            closed: None,
        }
    }

    pub fn with_odometer(mut self, odometer: u64) -> Self {
        self.odometer = odometer;
        self
    }

    pub fn with_manager(mut self, manager_id: ManagerId) -> Self {
        self.manager_id = manager_id;
        self
    }

    pub fn starting_at(mut self, start_at: DateTime<Utc>) -> Self {
        self.start_at = start_at;
        self
    }

    /// Closes the event `distance` units later, `duration` after it started
    pub fn closed_after(mut self, distance: u64, duration: Duration) -> Self {
        self.closed = Some((distance, duration));
        self
    }

    pub fn build(self) -> UsageEvent {
        let mut event = UsageEvent::open(
            self.car_id,
            self.driver_id,
            self.manager_id,
            Odometer::new(self.odometer),
        );
        event.start_at = self.start_at;
        event.created_at = self.start_at;
        event.updated_at = self.start_at;

        if let Some((distance, duration)) = self.closed {
            let end_at = self.start_at + duration;
            event.status = EventStatus::Closed;
            event.final_odometer = Some(Odometer::new(self.odometer + distance));
            event.end_at = Some(end_at);
            event.updated_at = end_at;
        }
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_car_builder_defaults() {
        let car = CarBuilder::new().build();
        assert!(car.is_available());
        assert!(car.is_active);
        assert_eq!(car.odometer, Odometer::new(10_000));
    }

    #[test]
    fn test_unique_plates() {
        assert_ne!(CarBuilder::new().build().license_plate, CarBuilder::new().build().license_plate);
    }

    #[test]
    fn test_closed_event_builder() {
        let event = UsageEventBuilder::new(CarId::new(), DriverId::new())
            .with_odometer(500)
            .closed_after(120, Duration::hours(2))
            .build();

        assert!(event.is_closed());
        assert_eq!(event.distance(), Some(120));
        assert_eq!(event.end_at, Some(event.start_at + Duration::hours(2)));
    }
}
