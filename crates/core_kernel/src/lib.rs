//! Core Kernel - Foundational types shared by the fleet crates
//!
//! This crate provides the building blocks used by every domain module:
//! - Strongly-typed identifiers
//! - Odometer readings
//! - Reporting periods
//! - Port error and health-check infrastructure

pub mod identifiers;
pub mod odometer;
pub mod temporal;
pub mod ports;
pub mod error;

pub use identifiers::{CarId, DriverId, ManagerId, UsageEventId};
pub use odometer::{Odometer, OdometerError};
pub use temporal::{ReportingPeriod, TemporalError};
pub use ports::{PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth};
pub use error::CoreError;
