//! Repository implementations
//!
//! Repositories own the SQL. They speak in row types with plain column values;
//! the adapters in [`crate::adapters`] map rows to domain records.

pub mod events;
pub mod fleet;

pub use events::{UsageEventRepository, UsageEventRow};
pub use fleet::{CarRepository, CarRow, DriverRepository, DriverRow};
