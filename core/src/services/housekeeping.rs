//! Background maintenance of OTP records and rate windows
//!
//! Two independent loops: record cleanup deletes finished records from the
//! store, the sweep evicts stale rate windows from memory. Neither affects
//! request-time correctness; expiry is always recomputed from the clock.

use chrono::Duration;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use otp_shared::HousekeepingConfig;

use crate::errors::DomainError;
use crate::repositories::OtpRepository;
use crate::services::clock::Clock;
use crate::services::rate_limit::{RateGovernor, SweepStats};

/// Runs record cleanup and rate-window sweeps
pub struct OtpHousekeeper<R: OtpRepository + 'static> {
    repository: Arc<R>,
    governor: Option<Arc<RateGovernor>>,
    clock: Arc<dyn Clock>,
    config: HousekeepingConfig,
}

impl<R: OtpRepository> OtpHousekeeper<R> {
    /// Create a housekeeper; without a governor only record cleanup runs
    pub fn new(
        repository: Arc<R>,
        governor: Option<Arc<RateGovernor>>,
        clock: Arc<dyn Clock>,
        config: HousekeepingConfig,
    ) -> Self {
        Self {
            repository,
            governor,
            clock,
            config,
        }
    }

    /// Delete records that are past expiry or finished
    pub async fn run_cleanup(&self) -> Result<usize, DomainError> {
        let deleted = self.repository.delete_finished(self.clock.now()).await?;
        if deleted > 0 {
            info!(deleted = deleted, event = "otp_cleanup", "Deleted finished OTP records");
        }
        Ok(deleted)
    }

    /// Evict stale rate windows
    pub async fn run_sweep(&self) -> Option<SweepStats> {
        let governor = self.governor.as_ref()?;
        Some(governor.sweep(self.sweep_retention()).await)
    }

    /// Configured retention, saturating at the largest representable span
    fn sweep_retention(&self) -> Duration {
        i64::try_from(self.config.sweep_retention_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }

    /// Spawn the cleanup and sweep loops
    ///
    /// Returns the task handles; aborting them stops the loops.
    pub fn start_background_tasks(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        if !self.config.enabled {
            warn!("OTP housekeeping is disabled");
            return Vec::new();
        }

        let mut handles = Vec::with_capacity(2);

        let cleanup = self.clone();
        handles.push(tokio::spawn(async move {
            let period = std::time::Duration::from_secs(cleanup.config.cleanup_interval_seconds.max(1));
            info!(
                interval_seconds = period.as_secs(),
                "OTP record cleanup started"
            );
            let mut timer = tokio::time::interval(period);
            loop {
                timer.tick().await;
                if let Err(e) = cleanup.run_cleanup().await {
                    error!(error = %e, event = "otp_cleanup_failed", "OTP record cleanup failed");
                }
            }
        }));

        if self.governor.is_some() {
            let sweeper = self.clone();
            handles.push(tokio::spawn(async move {
                let period = std::time::Duration::from_secs(sweeper.config.sweep_interval_seconds.max(1));
                info!(
                    interval_seconds = period.as_secs(),
                    "Rate window sweep started"
                );
                let mut timer = tokio::time::interval(period);
                loop {
                    timer.tick().await;
                    sweeper.run_sweep().await;
                }
            }));
        }

        handles
    }
}
