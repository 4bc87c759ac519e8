// Package shutdown provides graceful shutdown functionality.

use anyhow::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::Notify;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
#[error("graceful shutdown timeout exceeded")]
pub struct TimeoutError;

/// Graceful shutdown handler: a cancellation token plus a wait counter for
/// background units that must drain before the process exits.
#[derive(Clone)]
pub struct GracefulShutdown {
    shutdown_token: CancellationToken,
    timeout: Arc<tokio::sync::RwLock<Duration>>,
    pending: Arc<AtomicUsize>,
    drained: Arc<Notify>,
}

impl GracefulShutdown {
    /// Creates a new graceful shutdown handler.
    pub fn new(shutdown_token: CancellationToken) -> Self {
        Self {
            shutdown_token,
            timeout: Arc::new(tokio::sync::RwLock::new(Duration::from_secs(10))),
            pending: Arc::new(AtomicUsize::new(0)),
            drained: Arc::new(Notify::new()),
        }
    }

    /// Sets the graceful shutdown timeout.
    pub async fn set_graceful_timeout(&self, timeout: Duration) {
        *self.timeout.write().await = timeout;
    }

    /// Registers `n` units that must report completion before shutdown ends.
    pub fn add(&self, n: usize) {
        self.pending.fetch_add(n, Ordering::AcqRel);
    }

    /// Marks one unit as done.
    pub fn done(&self) {
        let previous = self.pending.fetch_sub(1, Ordering::AcqRel);
        if previous <= 1 {
            self.drained.notify_waiters();
        }
    }

    /// Waits for an OS signal or token cancellation, then waits for all
    /// registered units to drain within the configured timeout.
    pub async fn await_shutdown(&self) -> Result<()> {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!(
                    component = "graceful-shutdown",
                    event = "os_signal",
                    signal = "SIGINT",
                    "cancellation started"
                );
            }
            _ = self.shutdown_token.cancelled() => {
                info!(
                    component = "graceful-shutdown",
                    event = "ctx_done",
                    "cancellation started"
                );
            }
        }

        self.cancel_and_await_with_timeout().await
    }

    async fn cancel_and_await_with_timeout(&self) -> Result<()> {
        self.shutdown_token.cancel();

        let timeout_duration = *self.timeout.read().await;

        match timeout(timeout_duration, self.wait_for_completion()).await {
            Ok(_) => {
                info!(
                    component = "graceful-shutdown",
                    event = "shutdown_success",
                    "service was gracefully shut down"
                );
                Ok(())
            }
            Err(_) => {
                warn!(
                    component = "graceful-shutdown",
                    event = "shutdown_timeout",
                    timeout_secs = timeout_duration.as_secs(),
                    "not all tasks were closed within timeout"
                );
                Err(TimeoutError.into())
            }
        }
    }

    async fn wait_for_completion(&self) {
        loop {
            // Register interest before checking, so a `done` racing the
            // check cannot be missed.
            let mut drained = std::pin::pin!(self.drained.notified());
            drained.as_mut().enable();
            if self.pending.load(Ordering::Acquire) == 0 {
                return;
            }
            drained.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shutdown_waits_for_registered_units() {
        let token = CancellationToken::new();
        let gsh = GracefulShutdown::new(token.clone());
        gsh.set_graceful_timeout(Duration::from_secs(2)).await;
        gsh.add(1);

        let gsh_unit = gsh.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            gsh_unit.done();
        });

        token.cancel();
        assert!(gsh.await_shutdown().await.is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_times_out_on_stuck_unit() {
        let token = CancellationToken::new();
        let gsh = GracefulShutdown::new(token.clone());
        gsh.set_graceful_timeout(Duration::from_millis(100)).await;
        gsh.add(1);

        token.cancel();
        assert!(gsh.await_shutdown().await.is_err());
    }
}
