//! Fleet Directory Domain
//!
//! Cars and drivers are owned by their own systems of record. This crate
//! defines the records as the usage engine sees them and the two ports it
//! consumes:
//!
//! - [`CarDirectory`]: lookup by id or plate, status and odometer updates
//! - [`DriverDirectory`]: lookup by id
//!
//! In-memory adapters are available behind the `mock` feature.

pub mod car;
pub mod driver;
pub mod error;
pub mod ports;

pub use car::{Car, CarStatus, normalize_license_plate};
pub use driver::Driver;
pub use error::FleetError;
pub use ports::{CarDirectory, CarDirectoryExt, DriverDirectory, DriverDirectoryExt};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::{InMemoryCarDirectory, InMemoryDriverDirectory};
