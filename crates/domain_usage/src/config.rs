//! Usage engine configuration

use serde::Deserialize;

use core_kernel::CoreError;
use crate::policy::{OdometerPolicy, DEFAULT_MAX_ODOMETER_DELTA};

/// Environment variable prefix for [`UsageConfig::from_env`]
pub const ENV_PREFIX: &str = "FLEET";

/// Usage engine configuration
///
/// # Environment Variables
///
/// * `FLEET_MAX_ODOMETER_DELTA` - largest accepted jump between consecutive
///   odometer readings (default: 5000)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UsageConfig {
    #[serde(default = "default_max_odometer_delta")]
    pub max_odometer_delta: u64,
}

fn default_max_odometer_delta() -> u64 {
    DEFAULT_MAX_ODOMETER_DELTA
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            max_odometer_delta: DEFAULT_MAX_ODOMETER_DELTA,
        }
    }
}

impl UsageConfig {
    /// Loads configuration from `FLEET_*` environment variables
    ///
    /// A `.env` file in the working directory is read first if present.
    pub fn from_env() -> Result<Self, CoreError> {
        dotenvy::dotenv().ok();
        Self::from_env_prefix(ENV_PREFIX)
    }

    /// Loads configuration from environment variables with a custom prefix
    pub fn from_env_prefix(prefix: &str) -> Result<Self, CoreError> {
        let config: UsageConfig = config::Config::builder()
            .add_source(config::Environment::with_prefix(prefix).try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| CoreError::configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the engine cannot run with
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.max_odometer_delta == 0 {
            return Err(CoreError::configuration(
                "max_odometer_delta must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn odometer_policy(&self) -> OdometerPolicy {
        OdometerPolicy::new(self.max_odometer_delta)
    }
}
