//! Test Utilities Crate
//!
//! Shared test infrastructure for the fleet usage test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built cars, drivers and periods
//! - `builders`: Builders for records with only the relevant fields set
//! - `harness`: [`TestFleet`], an engine wired to in-memory adapters
//! - `assertions`: Fleet-wide invariant checks
//! - `generators`: Property-based test strategies
//! - `database`: PostgreSQL test containers
//! - `logging`: Tracing subscriber for test output

pub mod fixtures;
pub mod builders;
pub mod harness;
pub mod assertions;
pub mod generators;
pub mod database;
pub mod logging;

pub use fixtures::*;
pub use builders::*;
pub use harness::*;
pub use assertions::*;
pub use generators::*;
pub use database::*;
pub use logging::*;
