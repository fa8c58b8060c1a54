//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the fleet usage system using SQLx.
//!
//! # Architecture
//!
//! - [`repositories`]: SQL and row types, one repository per table
//! - [`adapters`]: implementations of the domain ports on top of the
//!   repositories, translating [`DatabaseError`] into `PortError`
//!
//! The schema lives in the workspace `migrations/` directory and is embedded
//! through [`MIGRATOR`]. Its partial unique index on open events, together
//! with conditional `UPDATE`/`DELETE` statements on event rows, backs up the
//! engine's per-car lock when several processes share a database.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PgEventStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/fleet")).await?;
//! run_migrations(&pool).await?;
//! let events = PgEventStore::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{DatabasePool, create_pool, create_pool_from_url, run_migrations, DatabaseConfig, MIGRATOR};
pub use error::DatabaseError;
pub use adapters::{PgCarDirectory, PgDriverDirectory, PgEventStore};
