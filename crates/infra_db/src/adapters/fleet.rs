//! PostgreSQL fleet directories
//!
//! Implement `CarDirectory` and `DriverDirectory` over the `cars` and
//! `drivers` tables. Registration and activation helpers stand in for the
//! car and driver management screens, which live outside this workspace.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{CarId, DomainPort, DriverId, HealthCheckResult, HealthCheckable, Odometer, PortError};
use domain_fleet::{normalize_license_plate, Car, CarDirectory, CarStatus, Driver, DriverDirectory};

use crate::error::DatabaseError;
use crate::repositories::{CarRepository, CarRow, DriverRepository, DriverRow};

pub(crate) fn car_to_row(car: &Car) -> Result<CarRow, PortError> {
    Ok(CarRow {
        car_id: *car.id.as_uuid(),
        license_plate: car.license_plate.clone(),
        model: car.model.clone(),
        odometer: car
            .odometer
            .to_i64()
            .map_err(|e| PortError::validation_field(e.to_string(), "odometer"))?,
        status: car.status.as_str().to_string(),
        is_active: car.is_active,
        created_at: car.created_at,
        updated_at: car.updated_at,
    })
}

pub(crate) fn row_to_car(row: CarRow) -> Result<Car, DatabaseError> {
    let odometer = Odometer::from_raw(row.odometer)
        .map_err(|e| DatabaseError::corrupt(format!("car {}: {}", row.car_id, e)))?;
    let status: CarStatus = row
        .status
        .parse()
        .map_err(|e| DatabaseError::corrupt(format!("car {}: {}", row.car_id, e)))?;

    Ok(Car {
        id: CarId::from(row.car_id),
        license_plate: row.license_plate,
        model: row.model,
        odometer,
        status,
        is_active: row.is_active,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn row_to_driver(row: DriverRow) -> Driver {
    Driver {
        id: DriverId::from(row.driver_id),
        name: row.name,
        is_active: row.is_active,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

/// PostgreSQL-backed implementation of [`CarDirectory`]
#[derive(Debug, Clone)]
pub struct PgCarDirectory {
    repository: CarRepository,
    pool: PgPool,
}

impl PgCarDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: CarRepository::new(pool.clone()),
            pool,
        }
    }

    /// Registers a car
    ///
    /// # Errors
    ///
    /// `PortError::Conflict` if the plate is already registered
    pub async fn register(&self, car: &Car) -> Result<(), PortError> {
        let row = car_to_row(car)?;
        Ok(self.repository.insert(&row).await?)
    }

    /// Activates or retires a car
    pub async fn set_active(&self, id: CarId, is_active: bool) -> Result<(), PortError> {
        Ok(self.repository.set_active(*id.as_uuid(), is_active).await?)
    }
}

impl DomainPort for PgCarDirectory {}

#[async_trait]
impl HealthCheckable for PgCarDirectory {
    async fn health_check(&self) -> HealthCheckResult {
        super::pool_health(&self.pool, "postgres-car-directory").await
    }
}

#[async_trait]
impl CarDirectory for PgCarDirectory {
    async fn get_car(&self, id: CarId) -> Result<Option<Car>, PortError> {
        self.repository
            .find_by_id(*id.as_uuid())
            .await?
            .map(|row| row_to_car(row).map_err(PortError::from))
            .transpose()
    }

    async fn find_by_license_plate(&self, license_plate: &str) -> Result<Option<Car>, PortError> {
        let Ok(plate) = normalize_license_plate(license_plate) else {
            return Ok(None);
        };
        self.repository
            .find_by_license_plate(&plate)
            .await?
            .map(|row| row_to_car(row).map_err(PortError::from))
            .transpose()
    }

    #[instrument(skip(self), fields(car_id = %id, status = %status))]
    async fn set_car_status(&self, id: CarId, status: CarStatus) -> Result<(), PortError> {
        Ok(self.repository.update_status(*id.as_uuid(), status.as_str()).await?)
    }

    #[instrument(skip(self), fields(car_id = %id, odometer = %odometer))]
    async fn set_car_odometer(&self, id: CarId, odometer: Odometer) -> Result<(), PortError> {
        let raw = odometer
            .to_i64()
            .map_err(|e| PortError::validation_field(e.to_string(), "odometer"))?;

        if self.repository.advance_odometer(*id.as_uuid(), raw).await? {
            return Ok(());
        }
        debug!("refusing odometer rollback");
        Err(PortError::validation_field(
            format!("odometer cannot go backwards to {}", odometer),
            "odometer",
        ))
    }
}

/// PostgreSQL-backed implementation of [`DriverDirectory`]
#[derive(Debug, Clone)]
pub struct PgDriverDirectory {
    repository: DriverRepository,
    pool: PgPool,
}

impl PgDriverDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: DriverRepository::new(pool.clone()),
            pool,
        }
    }

    pub async fn register(&self, driver: &Driver) -> Result<(), PortError> {
        let row = DriverRow {
            driver_id: *driver.id.as_uuid(),
            name: driver.name.clone(),
            is_active: driver.is_active,
            created_at: driver.created_at,
            updated_at: driver.updated_at,
        };
        Ok(self.repository.insert(&row).await?)
    }

    pub async fn set_active(&self, id: DriverId, is_active: bool) -> Result<(), PortError> {
        Ok(self.repository.set_active(*id.as_uuid(), is_active).await?)
    }
}

impl DomainPort for PgDriverDirectory {}

#[async_trait]
impl HealthCheckable for PgDriverDirectory {
    async fn health_check(&self) -> HealthCheckResult {
        super::pool_health(&self.pool, "postgres-driver-directory").await
    }
}

#[async_trait]
impl DriverDirectory for PgDriverDirectory {
    async fn get_driver(&self, id: DriverId) -> Result<Option<Driver>, PortError> {
        Ok(self
            .repository
            .find_by_id(*id.as_uuid())
            .await?
            .map(row_to_driver))
    }
}
