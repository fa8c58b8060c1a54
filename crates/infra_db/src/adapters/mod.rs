//! Port Adapters
//!
//! PostgreSQL implementations of the ports the usage engine consumes:
//!
//! - [`PgEventStore`]: `domain_usage::EventStore`
//! - [`PgCarDirectory`]: `domain_fleet::CarDirectory`
//! - [`PgDriverDirectory`]: `domain_fleet::DriverDirectory`
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use domain_usage::{EventLifecycleEngine, UsageConfig};
//! use infra_db::adapters::{PgCarDirectory, PgDriverDirectory, PgEventStore};
//!
//! let engine = EventLifecycleEngine::new(
//!     Arc::new(PgCarDirectory::new(pool.clone())),
//!     Arc::new(PgDriverDirectory::new(pool.clone())),
//!     Arc::new(PgEventStore::new(pool)),
//!     UsageConfig::from_env()?.odometer_policy(),
//! );
//! ```

pub mod events;
pub mod fleet;

pub use events::PgEventStore;
pub use fleet::{PgCarDirectory, PgDriverDirectory};

use chrono::Utc;
use sqlx::PgPool;

use core_kernel::{AdapterHealth, HealthCheckResult};

/// Runs `SELECT 1` against the pool and reports the outcome
async fn pool_health(pool: &PgPool, adapter_id: &str) -> HealthCheckResult {
    let start = std::time::Instant::now();

    let result = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await;

    let latency_ms = start.elapsed().as_millis() as u64;

    let (status, message) = match result {
        Ok(_) => (AdapterHealth::Healthy, None),
        Err(e) => (AdapterHealth::Unhealthy, Some(format!("Database error: {}", e))),
    };

    HealthCheckResult {
        adapter_id: adapter_id.to_string(),
        status,
        latency_ms,
        message,
        checked_at: Utc::now(),
    }
}
