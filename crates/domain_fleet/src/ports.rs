//! Fleet Directory Ports
//!
//! The usage engine does not own cars or drivers. It reaches them through two
//! narrow ports so the systems of record can be swapped:
//!
//! - **Database Adapter**: PostgreSQL tables (`infra_db`)
//! - **In-memory Adapter**: for tests and embedded use (feature `mock`)
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_fleet::ports::{CarDirectory, DriverDirectory};
//! use std::sync::Arc;
//!
//! pub struct UsageService {
//!     cars: Arc<dyn CarDirectory>,
//!     drivers: Arc<dyn DriverDirectory>,
//! }
//! ```

use async_trait::async_trait;

use core_kernel::{CarId, DriverId, DomainPort, Odometer, PortError};

use crate::car::{Car, CarStatus};
use crate::driver::Driver;

/// Port for the car system of record
#[async_trait]
pub trait CarDirectory: DomainPort {
    /// Looks up a car by id, active or not
    ///
    /// # Returns
    ///
    /// `None` if no such car exists
    async fn get_car(&self, id: CarId) -> Result<Option<Car>, PortError>;

    /// Looks up a car by license plate
    ///
    /// The plate is normalised before comparison, so `" abc-1 "` finds `ABC-1`.
    async fn find_by_license_plate(&self, license_plate: &str) -> Result<Option<Car>, PortError>;

    /// Overwrites the car's status
    ///
    /// # Errors
    ///
    /// `PortError::NotFound` if the car does not exist
    async fn set_car_status(&self, id: CarId, status: CarStatus) -> Result<(), PortError>;

    /// Records a new odometer reading
    ///
    /// # Errors
    ///
    /// * `PortError::NotFound` if the car does not exist
    /// * `PortError::Validation` if the reading is below the stored one
    async fn set_car_odometer(&self, id: CarId, odometer: Odometer) -> Result<(), PortError>;
}

/// Port for the driver system of record
#[async_trait]
pub trait DriverDirectory: DomainPort {
    /// Looks up a driver by id, active or not
    async fn get_driver(&self, id: DriverId) -> Result<Option<Driver>, PortError>;
}

/// Convenience lookups on top of [`CarDirectory`]
#[async_trait]
pub trait CarDirectoryExt: CarDirectory {
    /// Returns the car only if it exists and is active
    async fn get_active_car(&self, id: CarId) -> Result<Option<Car>, PortError> {
        Ok(self.get_car(id).await?.filter(|car| car.is_active))
    }
}

impl<T: CarDirectory + ?Sized> CarDirectoryExt for T {}

/// Convenience lookups on top of [`DriverDirectory`]
#[async_trait]
pub trait DriverDirectoryExt: DriverDirectory {
    /// Returns the driver only if it exists and is active
    async fn get_active_driver(&self, id: DriverId) -> Result<Option<Driver>, PortError> {
        Ok(self.get_driver(id).await?.filter(|driver| driver.is_active))
    }
}

impl<T: DriverDirectory + ?Sized> DriverDirectoryExt for T {}

/// In-memory directory adapters
///
/// These keep records in a `HashMap` behind a tokio `RwLock`. Besides the port
/// operations they expose seeding and editing helpers that stand in for the
/// out-of-scope car and driver management screens.
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use chrono::Utc;
    use tokio::sync::RwLock;

    use core_kernel::{HealthCheckable, HealthCheckResult};

    use crate::car::normalize_license_plate;

    /// In-memory implementation of [`CarDirectory`]
    #[derive(Debug, Default)]
    pub struct InMemoryCarDirectory {
        cars: Arc<RwLock<HashMap<CarId, Car>>>,
        fail_status_updates: AtomicBool,
    }

    impl InMemoryCarDirectory {
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populates with cars for testing
        pub async fn with_cars(cars: Vec<Car>) -> Result<Self, PortError> {
            let directory = Self::new();
            for car in cars {
                directory.insert(car).await?;
            }
            Ok(directory)
        }

        /// Registers a car
        ///
        /// # Errors
        ///
        /// `PortError::Conflict` if another car already has the same plate
        pub async fn insert(&self, car: Car) -> Result<(), PortError> {
            let mut cars = self.cars.write().await;
            let duplicate = cars
                .values()
                .any(|existing| existing.id != car.id && existing.license_plate == car.license_plate);
            if duplicate {
                return Err(PortError::conflict(format!(
                    "license plate {} already registered",
                    car.license_plate
                )));
            }
            cars.insert(car.id, car);
            Ok(())
        }

        /// Activates or retires a car, as a fleet manager would
        pub async fn set_active(&self, id: CarId, is_active: bool) -> Result<(), PortError> {
            let mut cars = self.cars.write().await;
            let car = cars.get_mut(&id).ok_or_else(|| PortError::not_found("Car", id))?;
            car.is_active = is_active;
            car.updated_at = Utc::now();
            Ok(())
        }

        /// Makes every later `set_car_status` call fail with a connection error
        pub fn fail_status_updates(&self, fail: bool) {
            self.fail_status_updates.store(fail, Ordering::SeqCst);
        }

        /// Returns every stored car
        pub async fn all(&self) -> Vec<Car> {
            self.cars.read().await.values().cloned().collect()
        }
    }

    impl DomainPort for InMemoryCarDirectory {}

    #[async_trait]
    impl HealthCheckable for InMemoryCarDirectory {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::always_healthy("memory-car-directory")
        }
    }

    #[async_trait]
    impl CarDirectory for InMemoryCarDirectory {
        async fn get_car(&self, id: CarId) -> Result<Option<Car>, PortError> {
            Ok(self.cars.read().await.get(&id).cloned())
        }

        async fn find_by_license_plate(&self, license_plate: &str) -> Result<Option<Car>, PortError> {
            let plate = match normalize_license_plate(license_plate) {
                Ok(plate) => plate,
                Err(_) => return Ok(None),
            };
            Ok(self
                .cars
                .read()
                .await
                .values()
                .find(|car| car.license_plate == plate)
                .cloned())
        }

        async fn set_car_status(&self, id: CarId, status: CarStatus) -> Result<(), PortError> {
            if self.fail_status_updates.load(Ordering::SeqCst) {
                return Err(PortError::connection("car directory unavailable"));
            }
            let mut cars = self.cars.write().await;
            let car = cars.get_mut(&id).ok_or_else(|| PortError::not_found("Car", id))?;
            car.set_status(status);
            Ok(())
        }

        async fn set_car_odometer(&self, id: CarId, odometer: Odometer) -> Result<(), PortError> {
            let mut cars = self.cars.write().await;
            let car = cars.get_mut(&id).ok_or_else(|| PortError::not_found("Car", id))?;
            car.advance_odometer(odometer)
                .map_err(|e| PortError::validation_field(e.to_string(), "odometer"))
        }
    }

    /// In-memory implementation of [`DriverDirectory`]
    #[derive(Debug, Default)]
    pub struct InMemoryDriverDirectory {
        drivers: Arc<RwLock<HashMap<DriverId, Driver>>>,
    }

    impl InMemoryDriverDirectory {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn with_drivers(drivers: Vec<Driver>) -> Self {
            let directory = Self::new();
            for driver in drivers {
                directory.insert(driver).await;
            }
            directory
        }

        pub async fn insert(&self, driver: Driver) {
            self.drivers.write().await.insert(driver.id, driver);
        }

        /// Activates or deactivates a driver
        ///
        /// The directory does not know about usage events; callers that must
        /// keep drivers with open events active check the engine first.
        pub async fn set_active(&self, id: DriverId, is_active: bool) -> Result<(), PortError> {
            let mut drivers = self.drivers.write().await;
            let driver = drivers
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("Driver", id))?;
            driver.set_active(is_active);
            Ok(())
        }
    }

    impl DomainPort for InMemoryDriverDirectory {}

    #[async_trait]
    impl HealthCheckable for InMemoryDriverDirectory {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::always_healthy("memory-driver-directory")
        }
    }

    #[async_trait]
    impl DriverDirectory for InMemoryDriverDirectory {
        async fn get_driver(&self, id: DriverId) -> Result<Option<Driver>, PortError> {
            Ok(self.drivers.read().await.get(&id).cloned())
        }
    }
}
