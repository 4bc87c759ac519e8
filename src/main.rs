// Main entrypoint for the deployd deployment trigger.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use deployd::app::App;
use deployd::config::{Config, ConfigTrait};
use deployd::controller;
use deployd::discovery::{Discovery, DockerDiscovery};
use deployd::shutdown::GracefulShutdown;
use deployd::workers::SyncWorker;

const CONFIG_PATH: &str = "cfg/deployd.cfg.yaml";
const CONFIG_PATH_LOCAL: &str = "cfg/deployd.cfg.local.yaml";

const DEFAULT_GRACEFUL_TIMEOUT: Duration = Duration::from_secs(60);

/// deployd - HTTP deployment trigger for labeled compose services
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Custom config file path
    #[arg(short, long, value_name = "FILE")]
    cfg: Option<PathBuf>,
}

/// Loads the configuration struct from YAML file.
/// Tries local config first, then falls back to default config.
fn load_cfg(path: Option<PathBuf>) -> Result<Config> {
    if let Some(custom_path) = path {
        let cfg = Config::load(&custom_path)
            .with_context(|| format!("failed to load custom config from {:?}", custom_path))?;
        info!(
            component = "config",
            event = "load_success",
            path = ?custom_path,
            "config loaded"
        );
        return Ok(cfg);
    }

    match Config::load(PathBuf::from(CONFIG_PATH_LOCAL)) {
        Ok(cfg) => {
            info!(
                component = "config",
                event = "load_success",
                path = CONFIG_PATH_LOCAL,
                "config loaded"
            );
            Ok(cfg)
        }
        Err(_) => {
            let cfg = Config::load(PathBuf::from(CONFIG_PATH))
                .with_context(|| format!("failed to load config from {}", CONFIG_PATH))?;
            info!(
                component = "config",
                event = "load_success",
                path = CONFIG_PATH,
                "config loaded"
            );
            Ok(cfg)
        }
    }
}

/// Configures structured logging based on configuration.
fn configure_logger(cfg: &Config) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let log_level = cfg
        .logs()
        .and_then(|logs| logs.level.as_ref())
        .map(|s| s.as_str())
        .unwrap_or("info");

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if cfg.is_prod() {
        // Production: JSON format
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        // Development: Pretty console format
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .init();
    }
}

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    // Initialize Prometheus metrics exporter BEFORE the tokio runtime starts
    if let Err(e) = controller::metrics::init_prometheus_exporter() {
        eprintln!("Warning: failed to initialize Prometheus metrics exporter: {}", e);
        eprintln!("Metrics endpoint will not be available");
    }

    tokio::runtime::Runtime::new()
        .context("failed to create tokio runtime")?
        .block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<()> {
    // Create cancellation token for graceful shutdown
    let shutdown_token = CancellationToken::new();

    // Load configuration
    let cfg = load_cfg(args.cfg)?;

    // Configure logger (must be done after config is loaded)
    configure_logger(&cfg);

    info!(
        component = "main",
        event = "runtime_configured",
        num_cpus = num_cpus::get(),
        "tokio runtime using all available cores"
    );

    // Setup graceful shutdown handler
    let graceful_shutdown = GracefulShutdown::new(shutdown_token.clone());
    graceful_shutdown
        .set_graceful_timeout(
            cfg.shutdown()
                .and_then(|s| s.graceful_timeout)
                .unwrap_or(DEFAULT_GRACEFUL_TIMEOUT),
        )
        .await;

    // Initialize the application against the docker discovery source
    let discovery = Arc::new(DockerDiscovery::new(&cfg)) as Arc<dyn Discovery>;
    let app = App::new(shutdown_token.clone(), cfg.clone(), discovery).await?;

    // Startup synchronization: without a reachable discovery source there is
    // nothing to serve, so a failure here is fatal.
    app.registry()
        .sync()
        .await
        .context("initial service discovery failed")?;

    // Keep the registry converging in the background, if configured
    if let Some(interval) = cfg.discovery().and_then(|d| d.resync_interval) {
        SyncWorker::spawn(shutdown_token.clone(), app.registry(), interval);
    }

    // Register app for graceful shutdown and start it
    graceful_shutdown.add(1);

    let app_clone = app.clone();
    let graceful_done = Arc::new(graceful_shutdown.clone());
    tokio::task::spawn(async move {
        if let Err(e) = app_clone.serve(graceful_done.clone()).await {
            error!(
                component = "main",
                scope = "app",
                event = "start_failed",
                error = %e,
                "failed to start app"
            );
            graceful_done.done();
        }
    });

    // Listen for OS signals or cancellation and wait for graceful shutdown
    if let Err(e) = graceful_shutdown.await_shutdown().await {
        error!(
            component = "main",
            scope = "service",
            event = "graceful_shutdown_failed",
            error = %e,
            "failed to gracefully shut down service"
        );
        return Err(e);
    }

    Ok(())
}
