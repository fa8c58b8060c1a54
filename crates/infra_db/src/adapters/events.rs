//! PostgreSQL Event Store
//!
//! Implements `EventStore` on top of [`UsageEventRepository`]. Rows that
//! cannot be mapped back to a `UsageEvent` (negative readings, unknown status)
//! are reported as invariant violations.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{error, instrument};

use core_kernel::{
    CarId, DomainPort, DriverId, HealthCheckResult, HealthCheckable, ManagerId, Odometer, PortError,
    ReportingPeriod, UsageEventId,
};
use domain_usage::{EventStatus, EventStore, UsageEvent};

use crate::error::DatabaseError;
use crate::repositories::{UsageEventRepository, UsageEventRow};

/// PostgreSQL-backed implementation of [`EventStore`]
#[derive(Debug, Clone)]
pub struct PgEventStore {
    repository: UsageEventRepository,
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: UsageEventRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn repository(&self) -> &UsageEventRepository {
        &self.repository
    }

    /// Tells a missing event apart from one another writer changed
    async fn refused_write(&self, id: UsageEventId) -> PortError {
        match self.repository.find_by_id(*id.as_uuid()).await {
            Ok(Some(_)) => PortError::conflict(format!("usage event {} was changed by another writer", id)),
            Ok(None) => PortError::not_found("UsageEvent", id),
            Err(e) => e.into(),
        }
    }
}

fn reading(raw: i64, column: &str, event_id: uuid::Uuid) -> Result<Odometer, DatabaseError> {
    Odometer::from_raw(raw)
        .map_err(|e| DatabaseError::corrupt(format!("usage event {}: {}: {}", event_id, column, e)))
}

fn to_i64(odometer: Odometer) -> Result<i64, PortError> {
    odometer
        .to_i64()
        .map_err(|e| PortError::validation_field(e.to_string(), "odometer"))
}

pub(crate) fn event_to_row(event: &UsageEvent) -> Result<UsageEventRow, PortError> {
    Ok(UsageEventRow {
        event_id: *event.id.as_uuid(),
        car_id: *event.car_id.as_uuid(),
        driver_id: *event.driver_id.as_uuid(),
        manager_id: *event.manager_id.as_uuid(),
        odometer: to_i64(event.odometer)?,
        final_odometer: event.final_odometer.map(to_i64).transpose()?,
        status: event.status.as_str().to_string(),
        start_at: event.start_at,
        end_at: event.end_at,
        created_at: event.created_at,
        updated_at: event.updated_at,
    })
}

pub(crate) fn row_to_event(row: UsageEventRow) -> Result<UsageEvent, DatabaseError> {
    let status: EventStatus = row
        .status
        .parse()
        .map_err(|e: String| DatabaseError::corrupt(format!("usage event {}: {}", row.event_id, e)))?;

    Ok(UsageEvent {
        id: UsageEventId::from(row.event_id),
        car_id: CarId::from(row.car_id),
        driver_id: DriverId::from(row.driver_id),
        manager_id: ManagerId::from(row.manager_id),
        odometer: reading(row.odometer, "odometer", row.event_id)?,
        final_odometer: row
            .final_odometer
            .map(|raw| reading(raw, "final_odometer", row.event_id))
            .transpose()?,
        status,
        start_at: row.start_at,
        end_at: row.end_at,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn rows_to_events(rows: Vec<UsageEventRow>) -> Result<Vec<UsageEvent>, PortError> {
    rows.into_iter()
        .map(|row| row_to_event(row).map_err(PortError::from))
        .collect()
}

impl DomainPort for PgEventStore {}

#[async_trait]
impl HealthCheckable for PgEventStore {
    async fn health_check(&self) -> HealthCheckResult {
        super::pool_health(&self.pool, "postgres-event-store").await
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    #[instrument(skip(self, event), fields(event_id = %event.id, car_id = %event.car_id))]
    async fn create(&self, event: &UsageEvent) -> Result<(), PortError> {
        let row = event_to_row(event)?;
        Ok(self.repository.insert(&row).await?)
    }

    #[instrument(skip(self, expected, replacement), fields(event_id = %expected.id))]
    async fn update(&self, expected: &UsageEvent, replacement: &UsageEvent) -> Result<(), PortError> {
        if expected.id != replacement.id {
            return Err(PortError::validation_field(
                format!("cannot replace usage event {} with {}", expected.id, replacement.id),
                "id",
            ));
        }
        let expected_row = event_to_row(expected)?;
        let replacement_row = event_to_row(replacement)?;
        if self
            .repository
            .update_if_unchanged(&expected_row, &replacement_row)
            .await?
        {
            return Ok(());
        }
        Err(self.refused_write(expected.id).await)
    }

    async fn find_by_id(&self, id: UsageEventId) -> Result<Option<UsageEvent>, PortError> {
        self.repository
            .find_by_id(*id.as_uuid())
            .await?
            .map(|row| row_to_event(row).map_err(PortError::from))
            .transpose()
    }

    async fn find_all(&self) -> Result<Vec<UsageEvent>, PortError> {
        rows_to_events(self.repository.find_all().await?)
    }

    async fn find_open_event_for_car(&self, car_id: CarId) -> Result<Option<UsageEvent>, PortError> {
        let mut rows = self.repository.find_open_for_car(*car_id.as_uuid()).await?;
        if rows.len() > 1 {
            error!(car_id = %car_id, count = rows.len(), "car has more than one open usage event");
            return Err(PortError::invariant_violation(format!(
                "car {} has {} open usage events",
                car_id,
                rows.len()
            )));
        }
        rows.pop()
            .map(|row| row_to_event(row).map_err(PortError::from))
            .transpose()
    }

    async fn find_open_events_for_driver(
        &self,
        driver_id: DriverId,
    ) -> Result<Vec<UsageEvent>, PortError> {
        rows_to_events(self.repository.find_open_for_driver(*driver_id.as_uuid()).await?)
    }

    async fn find_in_period(&self, period: &ReportingPeriod) -> Result<Vec<UsageEvent>, PortError> {
        rows_to_events(self.repository.find_overlapping(period.start, period.end).await?)
    }

    #[instrument(skip(self), fields(event_id = %id))]
    async fn delete(&self, id: UsageEventId) -> Result<(), PortError> {
        if self.repository.delete_open(*id.as_uuid()).await? {
            return Ok(());
        }
        Err(self.refused_write(id).await)
    }
}
