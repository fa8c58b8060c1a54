//! Car and driver repositories
//!
//! SQL access to the `cars` and `drivers` tables.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

const CAR_COLUMNS: &str =
    "car_id, license_plate, model, odometer, status, is_active, created_at, updated_at";

/// Database row for a car
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CarRow {
    pub car_id: Uuid,
    pub license_plate: String,
    pub model: Option<String>,
    pub odometer: i64,
    pub status: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database row for a driver
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DriverRow {
    pub driver_id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Repository for the `cars` table
#[derive(Debug, Clone)]
pub struct CarRepository {
    pool: PgPool,
}

impl CarRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// `DatabaseError::DuplicateEntry` if the id or plate is taken
    pub async fn insert(&self, row: &CarRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO cars (
                car_id, license_plate, model, odometer, status, is_active, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(row.car_id)
        .bind(&row.license_plate)
        .bind(&row.model)
        .bind(row.odometer)
        .bind(&row.status)
        .bind(row.is_active)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_id(&self, car_id: Uuid) -> Result<Option<CarRow>, DatabaseError> {
        let sql = format!("SELECT {CAR_COLUMNS} FROM cars WHERE car_id = $1");
        let row = sqlx::query_as::<_, CarRow>(&sql)
            .bind(car_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Expects an already normalised plate
    pub async fn find_by_license_plate(&self, plate: &str) -> Result<Option<CarRow>, DatabaseError> {
        let sql = format!("SELECT {CAR_COLUMNS} FROM cars WHERE license_plate = $1");
        let row = sqlx::query_as::<_, CarRow>(&sql)
            .bind(plate)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn update_status(&self, car_id: Uuid, status: &str) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE cars SET status = $2, updated_at = NOW() WHERE car_id = $1")
            .bind(car_id)
            .bind(status)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Car", car_id));
        }
        Ok(())
    }

    /// Raises the odometer to `odometer`
    ///
    /// Returns `false` without writing when the stored reading is higher.
    ///
    /// # Errors
    ///
    /// `DatabaseError::NotFound` if the car does not exist
    pub async fn advance_odometer(&self, car_id: Uuid, odometer: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE cars SET odometer = $2, updated_at = NOW() WHERE car_id = $1 AND odometer <= $2",
        )
        .bind(car_id)
        .bind(odometer)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }
        match self.find_by_id(car_id).await? {
            Some(_) => Ok(false),
            None => Err(DatabaseError::not_found("Car", car_id)),
        }
    }

    pub async fn set_active(&self, car_id: Uuid, is_active: bool) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE cars SET is_active = $2, updated_at = NOW() WHERE car_id = $1")
            .bind(car_id)
            .bind(is_active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Car", car_id));
        }
        Ok(())
    }
}

/// Repository for the `drivers` table
#[derive(Debug, Clone)]
pub struct DriverRepository {
    pool: PgPool,
}

impl DriverRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, row: &DriverRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO drivers (driver_id, name, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(row.driver_id)
        .bind(&row.name)
        .bind(row.is_active)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_id(&self, driver_id: Uuid) -> Result<Option<DriverRow>, DatabaseError> {
        let row = sqlx::query_as::<_, DriverRow>(
            "SELECT driver_id, name, is_active, created_at, updated_at FROM drivers WHERE driver_id = $1",
        )
        .bind(driver_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn set_active(&self, driver_id: Uuid, is_active: bool) -> Result<(), DatabaseError> {
        let result =
            sqlx::query("UPDATE drivers SET is_active = $2, updated_at = NOW() WHERE driver_id = $1")
                .bind(driver_id)
                .bind(is_active)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Driver", driver_id));
        }
        Ok(())
    }
}
