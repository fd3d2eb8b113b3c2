//! Standalone cleanup worker for the Redis record store
//!
//! Deletes finished OTP records on the configured schedule until Ctrl-C.
//! Rate windows live inside each service process and are swept there.

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing::info;

use otp_core::services::{OtpHousekeeper, SystemClock};
use otp_infra::{init_tracing, load_config, RedisOtpStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config().context("failed to load configuration")?;
    init_tracing(&config.logging).context("failed to initialize logging")?;

    info!(environment = %config.environment, "Starting OTP housekeeper");

    if !config.housekeeping.enabled {
        bail!("housekeeping is disabled in configuration");
    }

    let store = RedisOtpStore::connect(config.store.clone())
        .await
        .context("failed to connect to the record store")?;
    if !store.health_check().await.context("record store health check failed")? {
        bail!("record store did not answer PING");
    }

    let housekeeper = Arc::new(OtpHousekeeper::new(
        Arc::new(store),
        None,
        Arc::new(SystemClock),
        config.housekeeping.clone(),
    ));

    let deleted = housekeeper.run_cleanup().await.context("initial cleanup failed")?;
    info!(deleted = deleted, "Initial cleanup finished");

    let handles = housekeeper.start_background_tasks();

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("Shutdown signal received, stopping OTP housekeeper");
    for handle in handles {
        handle.abort();
    }

    Ok(())
}
