//! Event Lifecycle Engine
//!
//! The engine is the only writer of usage event transitions and the only
//! component that moves a car between AVAILABLE and IN_USE as a consequence of
//! them. Every command runs under the car's lock from [`CarLocks`] and re-reads
//! the event and car after acquiring it, so decisions are never made on stale
//! state.
//!
//! A command writes to two systems (the event store and the car directory).
//! When the second write fails the first is undone before the error is
//! returned. If undoing fails too, the command reports
//! [`UsageError::InvariantViolated`].
//!
//! The lock only serializes commands within one engine. Event writes are
//! compare-and-swap against the copy read under the lock, so an engine that
//! loses a race with another process sharing the store sees
//! [`UsageError::InvalidEventStatus`] or [`UsageError::EventNotFound`] and
//! leaves the winner's writes alone.
//!
//! # Example
//!
//! ```rust,ignore
//! let engine = EventLifecycleEngine::new(cars, drivers, events, OdometerPolicy::default());
//!
//! let event = engine
//!     .create_event(CreateEvent::new(car_id, driver_id, manager_id, 12_000))
//!     .await?;
//! let closed = engine.finalize_event(event.id, 12_180).await?;
//! assert_eq!(closed.distance(), Some(180));
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, instrument, warn};

use core_kernel::{CarId, DriverId, ManagerId, PortError, UsageEventId};
use domain_fleet::{Car, CarDirectory, CarDirectoryExt, CarStatus, DriverDirectory, DriverDirectoryExt};

use crate::error::UsageError;
use crate::event::UsageEvent;
use crate::locks::CarLocks;
use crate::outbox::{UsageNotification, UsageOutbox};
use crate::policy::OdometerPolicy;
use crate::reporting::UsageReports;
use crate::store::EventStore;

/// Command to check a car out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateEvent {
    pub car_id: CarId,
    pub driver_id: DriverId,
    pub manager_id: ManagerId,
    /// Raw reading as entered; negative values are rejected
    pub odometer: i64,
}

impl CreateEvent {
    pub fn new(car_id: CarId, driver_id: DriverId, manager_id: ManagerId, odometer: i64) -> Self {
        Self {
            car_id,
            driver_id,
            manager_id,
            odometer,
        }
    }
}

/// A car together with its OPEN event, read under the car's lock
#[derive(Debug, Clone)]
pub struct CarUsage {
    pub car: Car,
    pub open_event: Option<UsageEvent>,
}

impl CarUsage {
    /// True when the car is IN_USE exactly when it has an OPEN event
    pub fn is_consistent(&self) -> bool {
        self.car.is_in_use() == self.open_event.is_some()
    }
}

/// Turns the result of an undo step into the command's outcome
fn compensated<T>(result: Result<T, PortError>, action: &str) -> Result<(), UsageError> {
    match result {
        Ok(_) => Ok(()),
        Err(e) => {
            error!(error = %e, action, "compensation failed, usage state is inconsistent");
            Err(UsageError::InvariantViolated(format!("failed to {}: {}", action, e)))
        }
    }
}

/// Coordinates usage event transitions with the car directory
pub struct EventLifecycleEngine {
    cars: Arc<dyn CarDirectory>,
    drivers: Arc<dyn DriverDirectory>,
    events: Arc<dyn EventStore>,
    outbox: Option<Arc<dyn UsageOutbox>>,
    policy: OdometerPolicy,
    locks: CarLocks,
}

impl EventLifecycleEngine {
    pub fn new(
        cars: Arc<dyn CarDirectory>,
        drivers: Arc<dyn DriverDirectory>,
        events: Arc<dyn EventStore>,
        policy: OdometerPolicy,
    ) -> Self {
        Self {
            cars,
            drivers,
            events,
            outbox: None,
            policy,
            locks: CarLocks::new(),
        }
    }

    /// Publishes a notification for every committed transition
    pub fn with_outbox(mut self, outbox: Arc<dyn UsageOutbox>) -> Self {
        self.outbox = Some(outbox);
        self
    }

    pub fn policy(&self) -> OdometerPolicy {
        self.policy
    }

    /// Read-only reports over the same store and directory
    pub fn reports(&self) -> UsageReports {
        UsageReports::new(Arc::clone(&self.events), Arc::clone(&self.cars))
    }

    /// Checks a car out to a driver
    ///
    /// # Errors
    ///
    /// Checked in this order, each leaving all state unchanged:
    ///
    /// * `CarNotFound` if the car is missing or inactive
    /// * `DriverNotFound` if the driver is missing or inactive
    /// * `CarInUse` if the car is not AVAILABLE or already has an OPEN event
    /// * `InvalidOdometer` if the reading is negative or below the car's odometer
    /// * `OdometerTooHigh` if the reading is above the plausibility ceiling
    #[instrument(
        skip(self, command),
        fields(car_id = %command.car_id, driver_id = %command.driver_id, manager_id = %command.manager_id)
    )]
    pub async fn create_event(&self, command: CreateEvent) -> Result<UsageEvent, UsageError> {
        let _guard = self.locks.acquire(command.car_id).await;

        let car = self
            .cars
            .get_active_car(command.car_id)
            .await?
            .ok_or(UsageError::CarNotFound(command.car_id))?;
        self.drivers
            .get_active_driver(command.driver_id)
            .await?
            .ok_or(UsageError::DriverNotFound(command.driver_id))?;

        if !car.is_available() || self.events.find_open_event_for_car(car.id).await?.is_some() {
            return Err(UsageError::CarInUse(car.id));
        }

        let odometer = self.policy.check_reading(command.odometer, car.odometer)?;
        let event = UsageEvent::open(car.id, command.driver_id, command.manager_id, odometer);

        self.events.create(&event).await.map_err(|e| {
            if e.is_conflict() {
                UsageError::CarInUse(car.id)
            } else {
                UsageError::from(e)
            }
        })?;

        if let Err(e) = self.cars.set_car_status(car.id, CarStatus::InUse).await {
            compensated(self.events.delete(event.id).await, "remove event after car status update failed")?;
            return Err(e.into());
        }

        self.notify(UsageNotification::opened(&event)).await;
        Ok(event)
    }

    /// Checks a car back in
    ///
    /// The event is closed with `final_odometer`, the car's odometer advances
    /// to it and the car becomes AVAILABLE.
    ///
    /// # Errors
    ///
    /// * `EventNotFound` if no event has this id
    /// * `InvalidEventStatus` if the event is already closed
    /// * `InvalidOdometer` if the reading is negative, below the checkout
    ///   reading, or below the car's current odometer
    /// * `OdometerTooHigh` if the distance exceeds the plausibility ceiling
    /// * `InvariantViolated` if the event references a car that no longer exists
    #[instrument(skip(self), fields(event_id = %event_id))]
    pub async fn finalize_event(
        &self,
        event_id: UsageEventId,
        final_odometer: i64,
    ) -> Result<UsageEvent, UsageError> {
        let car_id = self.require_event(event_id).await?.car_id;
        let _guard = self.locks.acquire(car_id).await;

        let mut event = self.require_event(event_id).await?;
        if !event.is_open() {
            return Err(UsageError::InvalidEventStatus {
                id: event.id,
                status: event.status,
            });
        }

        let reading = self.policy.check_reading(final_odometer, event.odometer)?;

        let car = self.cars.get_car(car_id).await?.ok_or_else(|| {
            UsageError::InvariantViolated(format!("event {} references missing car {}", event.id, car_id))
        })?;
        if reading < car.odometer {
            return Err(UsageError::invalid_odometer(
                final_odometer,
                format!("below car odometer {}", car.odometer),
            ));
        }

        let checkout = event.clone();
        event.close(reading)?;
        if let Err(e) = self.events.update(&checkout, &event).await {
            return Err(self.lost_race(event_id, e).await);
        }

        // Reopening only succeeds while the stored copy is still the one written here
        if let Err(e) = self.cars.set_car_odometer(car_id, reading).await {
            compensated(
                self.events.update(&event, &checkout).await,
                "reopen event after odometer update failed",
            )?;
            return Err(e.into());
        }

        // The odometer has already advanced; it stays, since readings never go back
        if let Err(e) = self.cars.set_car_status(car_id, CarStatus::Available).await {
            compensated(
                self.events.update(&event, &checkout).await,
                "reopen event after car status update failed",
            )?;
            return Err(e.into());
        }

        if let Some(notification) = UsageNotification::closed(&event) {
            self.notify(notification).await;
        }
        Ok(event)
    }

    /// Cancels an OPEN event and releases its car
    ///
    /// # Errors
    ///
    /// * `EventNotFound` if no event has this id
    /// * `InvalidEventStatus` if the event is closed
    #[instrument(skip(self), fields(event_id = %event_id))]
    pub async fn delete_event(&self, event_id: UsageEventId) -> Result<(), UsageError> {
        let car_id = self.require_event(event_id).await?.car_id;
        let _guard = self.locks.acquire(car_id).await;

        let event = self.require_event(event_id).await?;
        if !event.is_open() {
            return Err(UsageError::InvalidEventStatus {
                id: event.id,
                status: event.status,
            });
        }

        let holds_car = self
            .events
            .find_open_event_for_car(car_id)
            .await?
            .is_some_and(|open| open.id == event.id);

        if let Err(e) = self.events.delete(event.id).await {
            return Err(self.lost_race(event_id, e).await);
        }

        if holds_car && self.cars.get_car(car_id).await?.is_some() {
            if let Err(e) = self.cars.set_car_status(car_id, CarStatus::Available).await {
                compensated(self.events.create(&event).await, "restore event after car status update failed")?;
                return Err(e.into());
            }
        }

        self.notify(UsageNotification::deleted(&event)).await;
        Ok(())
    }

    /// Looks up an event
    ///
    /// # Errors
    ///
    /// `EventNotFound` if no event has this id
    pub async fn get_event(&self, event_id: UsageEventId) -> Result<UsageEvent, UsageError> {
        self.require_event(event_id).await
    }

    /// Every event ordered by `start_at`
    pub async fn list_events(&self) -> Result<Vec<UsageEvent>, UsageError> {
        Ok(self.events.find_all().await?)
    }

    pub async fn open_event_for_car(&self, car_id: CarId) -> Result<Option<UsageEvent>, UsageError> {
        Ok(self.events.find_open_event_for_car(car_id).await?)
    }

    /// Whether the driver currently has a car checked out
    ///
    /// Driver management must refuse to deactivate a driver while this holds.
    pub async fn driver_has_open_event(&self, driver_id: DriverId) -> Result<bool, UsageError> {
        Ok(!self.events.find_open_events_for_driver(driver_id).await?.is_empty())
    }

    /// Reads a car and its OPEN event as one consistent snapshot
    ///
    /// # Errors
    ///
    /// `CarNotFound` if the car does not exist
    #[instrument(skip(self), fields(car_id = %car_id))]
    pub async fn car_usage(&self, car_id: CarId) -> Result<CarUsage, UsageError> {
        let _guard = self.locks.acquire(car_id).await;
        let car = self
            .cars
            .get_car(car_id)
            .await?
            .ok_or(UsageError::CarNotFound(car_id))?;
        let open_event = self.events.find_open_event_for_car(car_id).await?;
        Ok(CarUsage { car, open_event })
    }

    async fn require_event(&self, event_id: UsageEventId) -> Result<UsageEvent, UsageError> {
        self.events
            .find_by_id(event_id)
            .await?
            .ok_or(UsageError::EventNotFound(event_id))
    }

    /// Explains a refused event write by re-reading what the other writer left
    async fn lost_race(&self, event_id: UsageEventId, error: PortError) -> UsageError {
        if !error.is_conflict() && !error.is_not_found() {
            return error.into();
        }
        match self.events.find_by_id(event_id).await {
            Ok(Some(stored)) if !stored.is_open() => {
                warn!(event_id = %event_id, "usage event was closed by another writer");
                UsageError::InvalidEventStatus {
                    id: stored.id,
                    status: stored.status,
                }
            }
            Ok(None) => {
                warn!(event_id = %event_id, "usage event was removed by another writer");
                UsageError::EventNotFound(event_id)
            }
            Ok(Some(_)) => error.into(),
            Err(e) => e.into(),
        }
    }

    async fn notify(&self, notification: UsageNotification) {
        let Some(outbox) = &self.outbox else {
            return;
        };
        let notification_type = notification.notification_type();
        let event_id = notification.event_id();
        if let Err(e) = outbox.enqueue(notification).await {
            warn!(error = %e, notification_type, event_id = %event_id, "dropping usage notification");
        }
    }
}
