//! # Infrastructure Layer
//!
//! Concrete implementations behind the `otp_core` seams:
//! - **Store**: Redis record store with Lua-scripted atomic updates, and an
//!   in-memory store for development and tests
//! - **Cache**: Redis client with connection retry and health checks
//! - **Delivery**: SMS and email channels (Twilio, HTTP email API, console
//!   mocks) behind a router that picks the channel per identifier
//! - **Telemetry**: `tracing-subscriber` setup from [`LoggingConfig`]

use otp_core::errors::DomainError;
use otp_shared::{AppConfig, LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Cache module - Redis client and operations
pub mod cache;

/// Delivery module - SMS and email channels
pub mod delivery;

/// Store module - `OtpRepository` implementations
pub mod store;

pub use cache::RedisClient;
pub use delivery::{create_sender, ChannelRouter};
pub use store::{MemoryOtpStore, RedisOtpStore};

/// Load `.env` and the layered application configuration
pub fn load_config() -> Result<AppConfig, InfrastructureError> {
    dotenvy::dotenv().ok();
    AppConfig::load().map_err(|e| InfrastructureError::Config(e.to_string()))
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(logging: &LoggingConfig) -> Result<(), InfrastructureError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .map_err(|e| InfrastructureError::Config(format!("Invalid log level '{}': {}", logging.level, e)))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(logging.with_target)
        .with_ansi(logging.colored);

    let installed = match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };

    installed.map_err(|e| InfrastructureError::Config(format!("Failed to install tracing subscriber: {}", e)))
}

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Redis error
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// HTTP request error for external services
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stored data could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Delivery provider error
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// General infrastructure error
    #[error("Infrastructure error: {0}")]
    General(String),
}

impl From<InfrastructureError> for DomainError {
    fn from(err: InfrastructureError) -> Self {
        match err {
            InfrastructureError::Cache(_) | InfrastructureError::Serialization(_) => DomainError::Storage {
                message: err.to_string(),
            },
            other => DomainError::Internal {
                message: other.to_string(),
            },
        }
    }
}
