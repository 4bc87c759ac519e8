// Integration test harness setup.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::app::App;
use crate::config;
use crate::discovery::Discovery;
use crate::registry::Registry;
use crate::shutdown::GracefulShutdown;

use super::discovery::StaticDiscovery;

const TEST_PORT: &str = "8712";

/// Shared tokio runtime for the whole e2e suite.
///
/// The server, coordinators and every run task live on this runtime, so
/// they survive across individual test functions; tests `block_on` it.
pub fn rt() -> &'static tokio::runtime::Runtime {
    static RT: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
    RT.get_or_init(|| tokio::runtime::Runtime::new().expect("failed to build test runtime"))
}

pub struct Harness {
    addr: String,
    pub discovery: Arc<StaticDiscovery>,
    pub registry: Arc<Registry>,
}

/// Initializes the test harness once and returns it.
pub async fn harness() -> &'static Harness {
    static HARNESS: tokio::sync::OnceCell<Harness> = tokio::sync::OnceCell::const_new();
    HARNESS.get_or_init(Harness::start).await
}

impl Harness {
    async fn start() -> Harness {
        let mut cfg = config::new_test_config();
        cfg.deployd.deploy.as_mut().unwrap().command =
            Some(fake_compose_path().display().to_string());

        let discovery = StaticDiscovery::new();
        let shutdown_token = CancellationToken::new();

        let app = App::new(
            shutdown_token.clone(),
            cfg,
            discovery.clone() as Arc<dyn Discovery>,
        )
        .await
        .expect("failed to build app");
        let registry = app.registry();
        registry.sync().await.expect("startup sync failed");

        let graceful_shutdown = Arc::new(GracefulShutdown::new(shutdown_token.clone()));
        graceful_shutdown.add(1);
        app.serve(graceful_shutdown).await.expect("serve failed");

        let addr = format!("127.0.0.1:{}", TEST_PORT);

        // Wait for the server to come up.
        let health_url = format!("http://{}/healthz", addr);
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        loop {
            if let Ok(resp) = reqwest::get(&health_url).await {
                if resp.status().is_success() {
                    break;
                }
            }
            if tokio::time::Instant::now() > deadline {
                panic!("timed out waiting for test server at {}", health_url);
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        println!("[e2e] deployd at http://{}/healthz", addr);

        Harness {
            addr,
            discovery,
            registry,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn url(&self, service: &str) -> String {
        format!("http://{}/{}", self.addr, service)
    }

    /// Registers a service whose "deploy" executes `script_body` as a shell
    /// script. Picked up by the on-demand refresh on first request.
    pub async fn register_service(&self, name: &str, token: &str, script_body: &str) {
        let path = std::env::temp_dir().join(format!(
            "deployd-e2e-svc-{}-{}.sh",
            std::process::id(),
            name
        ));
        std::fs::write(&path, script_body).expect("failed to write service script");
        self.discovery
            .add(super::discovery::record(name, &path.display().to_string(), token))
            .await;
    }
}

/// Marker file path for counting deployment executions of one test service.
pub fn marker(tag: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("deployd-e2e-{}-{}", std::process::id(), tag));
    let _ = std::fs::remove_file(&path);
    path
}

pub fn run_count(path: &PathBuf) -> usize {
    std::fs::read_to_string(path)
        .map(|s| s.lines().count())
        .unwrap_or(0)
}

/// Fake orchestrator invoked as `<command> -f <file> up -d <service>`:
/// executes the file passed after `-f` as a shell script.
fn fake_compose_path() -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = std::env::temp_dir().join(format!("deployd-e2e-compose-{}", std::process::id()));
    std::fs::write(&path, b"#!/bin/sh\nexec /bin/sh \"$2\"\n")
        .expect("failed to write fake orchestrator");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("failed to chmod fake orchestrator");
    path
}
