//! Background maintenance configuration

use serde::{Deserialize, Serialize};

/// Schedules for record cleanup and rate-window sweeping
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HousekeepingConfig {
    /// Whether background tasks are started at all
    pub enabled: bool,

    /// Seconds between record cleanup runs
    pub cleanup_interval_seconds: u64,

    /// Seconds between rate-window sweeps
    pub sweep_interval_seconds: u64,

    /// Oldest timestamp age a sweep keeps, in seconds
    pub sweep_retention_seconds: u64,
}

impl Default for HousekeepingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cleanup_interval_seconds: 300,
            sweep_interval_seconds: 60,
            sweep_retention_seconds: 3600,
        }
    }
}
