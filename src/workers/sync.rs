//! Periodic registry re-synchronization worker.
//!
//! Keeps the registry converging on the discovery source without waiting
//! for a missed lookup to trigger an on-demand refresh. Failures are
//! absorbed; the registry keeps its last known state.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::registry::Registry;

pub struct SyncWorker;

impl SyncWorker {
    /// Spawns the re-sync loop. Stops when the shutdown token fires.
    pub fn spawn(
        shutdown_token: CancellationToken,
        registry: Arc<Registry>,
        interval: Duration,
    ) -> JoinHandle<()> {
        tokio::task::spawn(async move {
            info!(
                component = "sync-worker",
                event = "started",
                interval_secs = interval.as_secs(),
                "periodic registry sync started"
            );

            let mut ticker = tokio::time::interval(interval);
            // The registry was synchronized at startup; skip the immediate
            // first tick.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown_token.cancelled() => {
                        info!(
                            component = "sync-worker",
                            event = "stopped",
                            "periodic registry sync stopped"
                        );
                        return;
                    }
                    _ = ticker.tick() => {
                        match registry.sync().await {
                            Ok(()) => debug!(
                                component = "sync-worker",
                                event = "sync_ok",
                                "registry synchronized"
                            ),
                            Err(e) => warn!(
                                component = "sync-worker",
                                event = "sync_failed",
                                error = %e,
                                "periodic registry sync failed"
                            ),
                        }
                    }
                }
            }
        })
    }
}
