//! Periodic removal of expired result records.
//!
//! Reads already treat expired records as absent; this only reclaims
//! their storage.

use std::sync::Arc;
use std::time::Duration;

use review_core::store::ResultStore;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Run the purge loop until `cancel` is triggered.
pub async fn run(store: Arc<dyn ResultStore>, every: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = every.as_secs(), "Result purge job started");

    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Result purge job stopping");
                break;
            }
            _ = interval.tick() => {
                match store.purge_expired().await {
                    Ok(0) => tracing::debug!("Result purge: nothing expired"),
                    Ok(deleted) => tracing::info!(deleted, "Result purge: removed expired results"),
                    Err(e) => tracing::error!(error = %e, "Result purge: cleanup failed"),
                }
            }
        }
    }
}
