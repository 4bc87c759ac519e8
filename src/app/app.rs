// Main deployment trigger application implementation.

use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::Config;
use crate::controller::{DeployController, LivenessProbeController, PrometheusMetricsController};
use crate::discovery::Discovery;
use crate::http::{Controller, HttpServer};
use crate::rate::RefreshLimiter;
use crate::registry::Registry;

/// Encapsulates the entire application state.
pub struct App {
    shutdown_token: CancellationToken,
    registry: Arc<Registry>,
    server: Arc<HttpServer>,
}

impl App {
    /// Creates a new application instance.
    pub async fn new(
        shutdown_token: CancellationToken,
        cfg: Config,
        discovery: Arc<dyn Discovery>,
    ) -> Result<Self> {
        let registry = Registry::new(cfg.clone(), discovery);
        let refresh_limiter = Arc::new(RefreshLimiter::new(&cfg));

        let controllers: Vec<Box<dyn Controller>> = vec![
            Box::new(LivenessProbeController::new()),
            Box::new(PrometheusMetricsController::new()),
            Box::new(DeployController::new(registry.clone(), refresh_limiter)),
        ];
        let server = HttpServer::new(shutdown_token.clone(), cfg, controllers)?;

        Ok(Self {
            shutdown_token,
            registry,
            server,
        })
    }

    /// The process-wide service registry.
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Serves the HTTP endpoint in a background task and reports to the
    /// graceful shutdown handler when it stops.
    pub async fn serve(&self, gsh: Arc<crate::shutdown::GracefulShutdown>) -> Result<()> {
        let server = self.server.clone();
        let app_for_close = self.clone();

        tokio::task::spawn(async move {
            if let Err(e) = server.listen_and_serve().await {
                error!(
                    component = "app",
                    scope = "server",
                    event = "serve_failed",
                    error = %e,
                    "server failed to serve"
                );
            }

            app_for_close.close().await;

            gsh.done();
        });

        info!(component = "app", event = "started", "application lifecycle");

        Ok(())
    }

    /// Closes application resources: retires every coordinator (in-flight
    /// runs finish within the graceful window) and cancels the token.
    pub async fn close(&self) {
        self.registry.shutdown_all().await;
        self.shutdown_token.cancel();

        info!(component = "app", event = "stopped", "application lifecycle");
    }
}

impl Clone for App {
    fn clone(&self) -> Self {
        Self {
            shutdown_token: self.shutdown_token.clone(),
            registry: self.registry.clone(),
            server: self.server.clone(),
        }
    }
}
