//! Shared utilities and common types for OtpGuard
//!
//! This crate provides functionality used across the workspace:
//! - Runtime configuration types and the layered loader
//! - Identifier utilities (normalization, channel classification, masking)

pub mod config;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, DeliveryConfig, DeliveryProvider, Environment, HousekeepingConfig, LogFormat,
    LoggingConfig, StoreConfig,
};
pub use utils::identifier;
