//! Event Store Port
//!
//! Persistence of usage events. Besides plain CRUD the store enforces the
//! storage-level half of the single-open-event rule: `create` refuses a second
//! OPEN event for a car, and `find_open_event_for_car` reports corrupted data
//! holding two of them instead of silently picking one.
//!
//! Writes to an existing event are compare-and-swap: `update` only replaces
//! the stored copy it was shown, and `delete` only removes an OPEN event. Two
//! engines sharing one store therefore cannot both close the same event.
//!
//! Implementations:
//!
//! - [`InMemoryEventStore`]: `HashMap` behind a tokio `RwLock`
//! - `infra_db::PgEventStore`: PostgreSQL with a partial unique index

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use core_kernel::{
    CarId, DomainPort, DriverId, HealthCheckResult, HealthCheckable, PortError, ReportingPeriod,
    UsageEventId,
};
use crate::event::UsageEvent;

/// Port for usage event persistence
#[async_trait]
pub trait EventStore: DomainPort {
    /// Persists a new event
    ///
    /// # Errors
    ///
    /// `PortError::Conflict` if the id is taken, or if the event is OPEN and
    /// the car already has an OPEN event
    async fn create(&self, event: &UsageEvent) -> Result<(), PortError>;

    /// Replaces the stored event with `replacement`, provided the stored copy
    /// still equals `expected`
    ///
    /// # Errors
    ///
    /// * `PortError::NotFound` if no event has this id
    /// * `PortError::Validation` if the two events have different ids
    /// * `PortError::Conflict` if the stored copy has changed since `expected`
    ///   was read, or if the update would give the car a second OPEN event
    async fn update(&self, expected: &UsageEvent, replacement: &UsageEvent) -> Result<(), PortError>;

    async fn find_by_id(&self, id: UsageEventId) -> Result<Option<UsageEvent>, PortError>;

    /// Returns every event ordered by `start_at`
    async fn find_all(&self) -> Result<Vec<UsageEvent>, PortError>;

    /// Returns the car's OPEN event, if any
    ///
    /// # Errors
    ///
    /// `PortError::InvariantViolation` if the car has more than one OPEN event
    async fn find_open_event_for_car(&self, car_id: CarId) -> Result<Option<UsageEvent>, PortError>;

    /// Returns the driver's OPEN events ordered by `start_at`
    async fn find_open_events_for_driver(
        &self,
        driver_id: DriverId,
    ) -> Result<Vec<UsageEvent>, PortError>;

    /// Returns events whose interval overlaps `period`, ordered by `start_at`
    ///
    /// An OPEN event's interval extends to the present.
    async fn find_in_period(&self, period: &ReportingPeriod) -> Result<Vec<UsageEvent>, PortError>;

    /// Removes an OPEN event
    ///
    /// # Errors
    ///
    /// * `PortError::NotFound` if no event has this id
    /// * `PortError::Conflict` if the event is no longer OPEN
    async fn delete(&self, id: UsageEventId) -> Result<(), PortError>;
}

fn sort_by_start(events: &mut [UsageEvent]) {
    events.sort_by(|a, b| a.start_at.cmp(&b.start_at).then(a.id.cmp(&b.id)));
}

fn open_event_conflict(car_id: CarId, existing: UsageEventId) -> PortError {
    PortError::conflict(format!("car {} already has open event {}", car_id, existing))
}

fn stale_event_conflict(id: UsageEventId) -> PortError {
    PortError::conflict(format!("usage event {} was changed by another writer", id))
}

fn mismatched_ids(expected: &UsageEvent, replacement: &UsageEvent) -> Option<PortError> {
    (expected.id != replacement.id).then(|| {
        PortError::validation_field(
            format!("cannot replace usage event {} with {}", expected.id, replacement.id),
            "id",
        )
    })
}

/// In-memory implementation of [`EventStore`]
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventStore {
    events: Arc<RwLock<HashMap<UsageEventId, UsageEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an event without any uniqueness check
    ///
    /// Used to reproduce storage corruption, such as two OPEN events for one
    /// car, when exercising recovery paths.
    pub async fn insert_unchecked(&self, event: UsageEvent) {
        self.events.write().await.insert(event.id, event);
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

impl DomainPort for InMemoryEventStore {}

#[async_trait]
impl HealthCheckable for InMemoryEventStore {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult::always_healthy("memory-event-store")
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn create(&self, event: &UsageEvent) -> Result<(), PortError> {
        let mut events = self.events.write().await;
        if events.contains_key(&event.id) {
            return Err(PortError::conflict(format!("usage event {} already exists", event.id)));
        }
        if event.is_open() {
            if let Some(existing) = events
                .values()
                .find(|e| e.car_id == event.car_id && e.is_open())
            {
                return Err(open_event_conflict(event.car_id, existing.id));
            }
        }
        events.insert(event.id, event.clone());
        Ok(())
    }

    async fn update(&self, expected: &UsageEvent, replacement: &UsageEvent) -> Result<(), PortError> {
        if let Some(e) = mismatched_ids(expected, replacement) {
            return Err(e);
        }
        let mut events = self.events.write().await;
        match events.get(&expected.id) {
            None => return Err(PortError::not_found("UsageEvent", expected.id)),
            Some(stored) if stored != expected => return Err(stale_event_conflict(expected.id)),
            Some(_) => {}
        }
        if replacement.is_open() {
            if let Some(existing) = events
                .values()
                .find(|e| e.id != replacement.id && e.car_id == replacement.car_id && e.is_open())
            {
                return Err(open_event_conflict(replacement.car_id, existing.id));
            }
        }
        events.insert(replacement.id, replacement.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: UsageEventId) -> Result<Option<UsageEvent>, PortError> {
        Ok(self.events.read().await.get(&id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<UsageEvent>, PortError> {
        let mut events: Vec<_> = self.events.read().await.values().cloned().collect();
        sort_by_start(&mut events);
        Ok(events)
    }

    async fn find_open_event_for_car(&self, car_id: CarId) -> Result<Option<UsageEvent>, PortError> {
        let mut open: Vec<_> = self
            .events
            .read()
            .await
            .values()
            .filter(|e| e.car_id == car_id && e.is_open())
            .cloned()
            .collect();

        if open.len() > 1 {
            tracing::error!(car_id = %car_id, count = open.len(), "car has more than one open usage event");
            return Err(PortError::invariant_violation(format!(
                "car {} has {} open usage events",
                car_id,
                open.len()
            )));
        }
        Ok(open.pop())
    }

    async fn find_open_events_for_driver(
        &self,
        driver_id: DriverId,
    ) -> Result<Vec<UsageEvent>, PortError> {
        let mut events: Vec<_> = self
            .events
            .read()
            .await
            .values()
            .filter(|e| e.driver_id == driver_id && e.is_open())
            .cloned()
            .collect();
        sort_by_start(&mut events);
        Ok(events)
    }

    async fn find_in_period(&self, period: &ReportingPeriod) -> Result<Vec<UsageEvent>, PortError> {
        let mut events: Vec<_> = self
            .events
            .read()
            .await
            .values()
            .filter(|e| period.overlaps_interval(e.start_at, e.end_at))
            .cloned()
            .collect();
        sort_by_start(&mut events);
        Ok(events)
    }

    async fn delete(&self, id: UsageEventId) -> Result<(), PortError> {
        let mut events = self.events.write().await;
        match events.get(&id) {
            None => Err(PortError::not_found("UsageEvent", id)),
            Some(stored) if !stored.is_open() => Err(stale_event_conflict(id)),
            Some(_) => {
                events.remove(&id);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use core_kernel::{ManagerId, Odometer};

    fn open_event(car_id: CarId) -> UsageEvent {
        UsageEvent::open(car_id, DriverId::new(), ManagerId::new(), Odometer::new(100))
    }

    #[tokio::test]
    async fn test_second_open_event_for_car_conflicts() {
        let store = InMemoryEventStore::new();
        let car_id = CarId::new();
        store.create(&open_event(car_id)).await.unwrap();

        let result = store.create(&open_event(car_id)).await;
        assert!(result.unwrap_err().is_conflict());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_closed_events_do_not_conflict() {
        let store = InMemoryEventStore::new();
        let car_id = CarId::new();
        let first = open_event(car_id);
        store.create(&first).await.unwrap();
        let mut closed = first.clone();
        closed.close(Odometer::new(150)).unwrap();
        store.update(&first, &closed).await.unwrap();

        store.create(&open_event(car_id)).await.unwrap();
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_reopening_update_conflicts_with_other_open_event() {
        let store = InMemoryEventStore::new();
        let car_id = CarId::new();
        let first = open_event(car_id);
        store.create(&first).await.unwrap();
        let mut closed = first.clone();
        closed.close(Odometer::new(150)).unwrap();
        store.update(&first, &closed).await.unwrap();
        store.create(&open_event(car_id)).await.unwrap();

        assert!(store.update(&closed, &first).await.unwrap_err().is_conflict());
        assert_eq!(store.find_by_id(first.id).await.unwrap(), Some(closed));
    }

    #[tokio::test]
    async fn test_update_from_stale_copy_conflicts() {
        let store = InMemoryEventStore::new();
        let checkout = open_event(CarId::new());
        store.create(&checkout).await.unwrap();

        let mut first = checkout.clone();
        first.close(Odometer::new(160)).unwrap();
        let mut second = checkout.clone();
        second.close(Odometer::new(140)).unwrap();

        store.update(&checkout, &first).await.unwrap();
        assert!(store.update(&checkout, &second).await.unwrap_err().is_conflict());
        assert_eq!(store.find_by_id(checkout.id).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_closed_event_cannot_be_deleted() {
        let store = InMemoryEventStore::new();
        let checkout = open_event(CarId::new());
        store.create(&checkout).await.unwrap();
        let mut closed = checkout.clone();
        closed.close(Odometer::new(100)).unwrap();
        store.update(&checkout, &closed).await.unwrap();

        assert!(store.delete(checkout.id).await.unwrap_err().is_conflict());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_update_with_different_ids_rejected() {
        let store = InMemoryEventStore::new();
        let event = open_event(CarId::new());
        store.create(&event).await.unwrap();

        let other = open_event(event.car_id);
        let result = store.update(&event, &other).await;
        assert!(matches!(result, Err(PortError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_two_open_events_reported_as_invariant_violation() {
        let store = InMemoryEventStore::new();
        let car_id = CarId::new();
        store.insert_unchecked(open_event(car_id)).await;
        store.insert_unchecked(open_event(car_id)).await;

        let result = store.find_open_event_for_car(car_id).await;
        assert!(matches!(result, Err(PortError::InvariantViolation { .. })));
    }

    #[tokio::test]
    async fn test_update_and_delete_unknown_event() {
        let store = InMemoryEventStore::new();
        let event = open_event(CarId::new());

        assert!(store.update(&event, &event).await.unwrap_err().is_not_found());
        assert!(store.delete(event.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_find_in_period_includes_open_events() {
        let store = InMemoryEventStore::new();
        let event = open_event(CarId::new());
        store.create(&event).await.unwrap();

        let now = Utc::now();
        let current = ReportingPeriod::trailing(now + Duration::hours(1), Duration::days(1)).unwrap();
        let past = ReportingPeriod::bounded(now - Duration::days(3), now - Duration::days(2)).unwrap();

        assert_eq!(store.find_in_period(&current).await.unwrap().len(), 1);
        assert!(store.find_in_period(&past).await.unwrap().is_empty());
    }
}
