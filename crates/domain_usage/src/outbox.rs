//! Usage notifications
//!
//! After a lifecycle transition commits, the engine appends a notification to
//! an outbox. Consumers (mailers, dashboards, billing exports) drain the outbox
//! on their own schedule, so nothing downstream runs inside an engine command.

use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use core_kernel::{CarId, DomainPort, DriverId, ManagerId, Odometer, PortError, UsageEventId};
use crate::event::UsageEvent;

/// Something that happened to a usage event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UsageNotification {
    /// A car was checked out
    EventOpened {
        event_id: UsageEventId,
        car_id: CarId,
        driver_id: DriverId,
        manager_id: ManagerId,
        odometer: Odometer,
        timestamp: DateTime<Utc>,
    },

    /// A car was checked back in
    EventClosed {
        event_id: UsageEventId,
        car_id: CarId,
        driver_id: DriverId,
        final_odometer: Odometer,
        distance: u64,
        timestamp: DateTime<Utc>,
    },

    /// An open checkout was cancelled
    EventDeleted {
        event_id: UsageEventId,
        car_id: CarId,
        timestamp: DateTime<Utc>,
    },
}

impl UsageNotification {
    pub fn opened(event: &UsageEvent) -> Self {
        UsageNotification::EventOpened {
            event_id: event.id,
            car_id: event.car_id,
            driver_id: event.driver_id,
            manager_id: event.manager_id,
            odometer: event.odometer,
            timestamp: event.start_at,
        }
    }

    /// Built from a closed event; an open event yields `None`
    pub fn closed(event: &UsageEvent) -> Option<Self> {
        Some(UsageNotification::EventClosed {
            event_id: event.id,
            car_id: event.car_id,
            driver_id: event.driver_id,
            final_odometer: event.final_odometer?,
            distance: event.distance()?,
            timestamp: event.end_at?,
        })
    }

    pub fn deleted(event: &UsageEvent) -> Self {
        UsageNotification::EventDeleted {
            event_id: event.id,
            car_id: event.car_id,
            timestamp: Utc::now(),
        }
    }

    pub fn event_id(&self) -> UsageEventId {
        match self {
            UsageNotification::EventOpened { event_id, .. }
            | UsageNotification::EventClosed { event_id, .. }
            | UsageNotification::EventDeleted { event_id, .. } => *event_id,
        }
    }

    pub fn car_id(&self) -> CarId {
        match self {
            UsageNotification::EventOpened { car_id, .. }
            | UsageNotification::EventClosed { car_id, .. }
            | UsageNotification::EventDeleted { car_id, .. } => *car_id,
        }
    }

    /// Returns the notification type name for routing
    pub fn notification_type(&self) -> &'static str {
        match self {
            UsageNotification::EventOpened { .. } => "event_opened",
            UsageNotification::EventClosed { .. } => "event_closed",
            UsageNotification::EventDeleted { .. } => "event_deleted",
        }
    }
}

/// Port for the notification outbox
#[async_trait]
pub trait UsageOutbox: DomainPort {
    async fn enqueue(&self, notification: UsageNotification) -> Result<(), PortError>;
}

/// FIFO outbox kept in memory
#[derive(Debug, Default)]
pub struct InMemoryOutbox {
    queue: Mutex<VecDeque<UsageNotification>>,
}

impl InMemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns every pending notification, oldest first
    pub async fn drain(&self) -> Vec<UsageNotification> {
        self.queue.lock().await.drain(..).collect()
    }

    pub async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.queue.lock().await.is_empty()
    }
}

impl DomainPort for InMemoryOutbox {}

#[async_trait]
impl UsageOutbox for InMemoryOutbox {
    async fn enqueue(&self, notification: UsageNotification) -> Result<(), PortError> {
        self.queue.lock().await.push_back(notification);
        Ok(())
    }
}
