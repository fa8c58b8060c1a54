//! Usage event repository
//!
//! SQL access to the `usage_events` table. The partial unique index
//! `usage_events_one_open_per_car` rejects a second open event for a car with
//! a unique violation, surfaced as `DatabaseError::DuplicateEntry`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

const EVENT_COLUMNS: &str = "event_id, car_id, driver_id, manager_id, odometer, final_odometer, \
     status, start_at, end_at, created_at, updated_at";

/// Database row for a usage event
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct UsageEventRow {
    pub event_id: Uuid,
    pub car_id: Uuid,
    pub driver_id: Uuid,
    pub manager_id: Uuid,
    pub odometer: i64,
    pub final_odometer: Option<i64>,
    pub status: String,
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Repository for the `usage_events` table
#[derive(Debug, Clone)]
pub struct UsageEventRepository {
    pool: PgPool,
}

impl UsageEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, row: &UsageEventRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO usage_events (
                event_id, car_id, driver_id, manager_id, odometer, final_odometer,
                status, start_at, end_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(row.event_id)
        .bind(row.car_id)
        .bind(row.driver_id)
        .bind(row.manager_id)
        .bind(row.odometer)
        .bind(row.final_odometer)
        .bind(&row.status)
        .bind(row.start_at)
        .bind(row.end_at)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Overwrites the mutable columns of an event, provided they still hold
    /// the values in `expected`
    ///
    /// Returns false when no row matched, either because the event is gone or
    /// because another writer changed it first.
    pub async fn update_if_unchanged(
        &self,
        expected: &UsageEventRow,
        replacement: &UsageEventRow,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE usage_events
            SET odometer = $2,
                final_odometer = $3,
                status = $4,
                end_at = $5,
                updated_at = $6
            WHERE event_id = $1
              AND odometer = $7
              AND final_odometer IS NOT DISTINCT FROM $8
              AND status = $9
              AND end_at IS NOT DISTINCT FROM $10
              AND updated_at = $11
            "#,
        )
        .bind(replacement.event_id)
        .bind(replacement.odometer)
        .bind(replacement.final_odometer)
        .bind(&replacement.status)
        .bind(replacement.end_at)
        .bind(replacement.updated_at)
        .bind(expected.odometer)
        .bind(expected.final_odometer)
        .bind(&expected.status)
        .bind(expected.end_at)
        .bind(expected.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn find_by_id(&self, event_id: Uuid) -> Result<Option<UsageEventRow>, DatabaseError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM usage_events WHERE event_id = $1");
        let row = sqlx::query_as::<_, UsageEventRow>(&sql)
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn find_all(&self) -> Result<Vec<UsageEventRow>, DatabaseError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM usage_events ORDER BY start_at, event_id");
        let rows = sqlx::query_as::<_, UsageEventRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Every open event of the car; more than one means the index is missing
    pub async fn find_open_for_car(&self, car_id: Uuid) -> Result<Vec<UsageEventRow>, DatabaseError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM usage_events \
             WHERE car_id = $1 AND status = 'open' ORDER BY start_at"
        );
        let rows = sqlx::query_as::<_, UsageEventRow>(&sql)
            .bind(car_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn find_open_for_driver(&self, driver_id: Uuid) -> Result<Vec<UsageEventRow>, DatabaseError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM usage_events \
             WHERE driver_id = $1 AND status = 'open' ORDER BY start_at, event_id"
        );
        let rows = sqlx::query_as::<_, UsageEventRow>(&sql)
            .bind(driver_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Events whose `[start_at, end_at)` interval overlaps `[start, end)`
    ///
    /// A missing `end` means the period is open-ended; an open event runs until
    /// now. A zero-length event counts when its instant is inside the period.
    pub async fn find_overlapping(
        &self,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<UsageEventRow>, DatabaseError> {
        let sql = format!(
            r#"
            SELECT {EVENT_COLUMNS} FROM usage_events
            WHERE CASE
                WHEN end_at = start_at THEN
                    start_at >= $1 AND start_at < COALESCE($2, 'infinity'::timestamptz)
                ELSE
                    start_at < COALESCE($2, 'infinity'::timestamptz)
                    AND COALESCE(end_at, 'infinity'::timestamptz) > $1
            END
            ORDER BY start_at, event_id
            "#
        );
        let rows = sqlx::query_as::<_, UsageEventRow>(&sql)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Deletes the event if it is still open
    ///
    /// Returns false when no open row had this id.
    pub async fn delete_open(&self, event_id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM usage_events WHERE event_id = $1 AND status = 'open'")
            .bind(event_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
