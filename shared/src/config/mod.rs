//! Configuration module with business-specific sub-modules
//!
//! This module organizes runtime configuration into logical areas:
//! - `delivery` - Code delivery providers (mock, Twilio, HTTP email API)
//! - `environment` - Environment detection and logging configuration
//! - `housekeeping` - Cleanup and rate-window sweep schedules
//! - `store` - Redis record store connection settings
//!
//! Settings are layered: built-in defaults, then `otp.toml`, then the
//! environment-specific file (`otp.<env>.toml`), then `OTP__*` variables
//! (for example `OTP__STORE__URL` or `OTP__DELIVERY__PROVIDER`).

pub mod delivery;
pub mod environment;
pub mod housekeeping;
pub mod store;

use serde::{Deserialize, Serialize};

pub use delivery::{DeliveryConfig, DeliveryProvider, EmailApiConfig, TwilioConfig};
pub use environment::{Environment, LogFormat, LoggingConfig};
pub use housekeeping::HousekeepingConfig;
pub use store::StoreConfig;

/// Base configuration file, looked up in the working directory
const BASE_CONFIG_FILE: &str = "otp.toml";

/// Prefix for environment variable overrides
const ENV_PREFIX: &str = "OTP";

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Environment configuration
    pub environment: Environment,

    /// Record store configuration
    pub store: StoreConfig,

    /// Delivery channel configuration
    pub delivery: DeliveryConfig,

    /// Background maintenance configuration
    pub housekeeping: HousekeepingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Create configuration for development environment
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            logging: LoggingConfig::for_environment(Environment::Development),
            ..Default::default()
        }
    }

    /// Load layered configuration for the environment named by `ENVIRONMENT`
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_for(Environment::from_env())
    }

    /// Load layered configuration for an explicit environment
    pub fn load_for(environment: Environment) -> Result<Self, config::ConfigError> {
        let defaults = Self {
            environment,
            logging: LoggingConfig::for_environment(environment),
            ..Default::default()
        };

        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&defaults)?)
            .add_source(config::File::with_name(BASE_CONFIG_FILE).required(false))
            .add_source(config::File::with_name(environment.config_file()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut loaded: Self = settings.try_deserialize()?;
        loaded.environment = environment;
        Ok(loaded)
    }
}
