//! Vehicle Usage Domain
//!
//! Tracks which car is checked out by which driver and keeps car status and
//! odometer readings consistent across checkout and check-in.
//!
//! - [`EventLifecycleEngine`]: create, finalize and delete usage events
//! - [`EventStore`]: persistence port, with [`InMemoryEventStore`]
//! - [`OdometerPolicy`] / [`UsageConfig`]: plausibility ceiling for readings
//! - [`UsageOutbox`]: notifications of committed transitions
//! - [`UsageReports`]: per-driver and per-car usage over a period

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod locks;
pub mod outbox;
pub mod policy;
pub mod reporting;
pub mod store;

pub use crate::config::UsageConfig;
pub use engine::{CarUsage, CreateEvent, EventLifecycleEngine};
pub use error::UsageError;
pub use event::{EventStatus, UsageEvent};
pub use locks::CarLocks;
pub use outbox::{InMemoryOutbox, UsageNotification, UsageOutbox};
pub use policy::{OdometerPolicy, DEFAULT_MAX_ODOMETER_DELTA};
pub use reporting::{CarUsageSummary, UsageReports};
pub use store::{EventStore, InMemoryEventStore};
