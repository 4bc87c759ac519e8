//! HTTP server implementation.
//

use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::{Config, ConfigTrait};
use crate::controller::controller::Controller;

/// HTTP server: builds the router from controllers and serves it until the
/// shutdown token fires.
///
/// No request timeout layer on purpose: a deployment response streams for as
/// long as the deployment runs, and the transport disconnecting is the only
/// cancellation signal.
pub struct HttpServer {
    shutdown_token: CancellationToken,
    config: Config,
    router: Router,
}

impl HttpServer {
    /// Creates a new HTTP server.
    pub fn new(
        shutdown_token: CancellationToken,
        config: Config,
        controllers: Vec<Box<dyn Controller>>,
    ) -> Result<Arc<Self>> {
        let router = Self::build_router(controllers);

        Ok(Arc::new(Self {
            shutdown_token,
            config,
            router,
        }))
    }

    /// Starts the HTTP server (blocking until shutdown).
    pub async fn listen_and_serve(&self) -> Result<()> {
        let api_cfg = self.config.api().context("API configuration is required")?;

        let name = api_cfg.name.as_deref().unwrap_or("deployd");
        let port = api_cfg.port.as_deref().unwrap_or("4711");

        let addr: SocketAddr = format!("0.0.0.0:{}", port.trim_start_matches(':'))
            .parse()
            .context("failed to parse server address")?;

        info!(
            component = "server",
            event = "started",
            name = name,
            port = port,
            "server started"
        );

        let listener = TcpListener::bind(&addr)
            .await
            .context("failed to bind TCP listener")?;

        let shutdown_token = self.shutdown_token.clone();
        let serve_future =
            axum::serve(listener, self.router.clone()).with_graceful_shutdown(async move {
                shutdown_token.cancelled().await;
            });

        if let Err(e) = serve_future.await {
            error!(
                component = "server",
                event = "listen_and_serve_failed",
                name = name,
                port = port,
                error = %e,
                "server failed to listen and serve"
            );
            return Err(e.into());
        }

        info!(
            component = "server",
            event = "stopped",
            name = name,
            port = port,
            "server stopped"
        );

        Ok(())
    }

    /// Builds the router with all controllers.
    fn build_router(controllers: Vec<Box<dyn Controller>>) -> Router {
        let mut router = Router::new();
        for controller in controllers {
            router = controller.add_route(router);
        }
        router.layer(TraceLayer::new_for_http())
    }
}
