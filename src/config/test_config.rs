use std::time::Duration;

use super::{Api, Config, Deploy, DeploydBox, DiscoveryCfg, Logs, Shutdown};

/// Creates a new test configuration.
///
/// The deploy command is a placeholder; the test harness points it at its
/// fake orchestrator before starting the app.
pub fn new_test_config() -> Config {
    Config {
        deployd: DeploydBox {
            env: super::TEST.to_string(),
            logs: Some(Logs {
                level: Some("debug".to_string()),
            }),
            api: Some(Api {
                name: Some("deployd-test".to_string()),
                port: Some("8712".to_string()),
            }),
            discovery: Some(DiscoveryCfg {
                docker_bin: Some("docker".to_string()),
                token_label: Some("deployd.token".to_string()),
                // Effectively unlimited so tests can exercise on-demand
                // refresh without tripping the limiter.
                refresh_limit: Some(1000),
                refresh_window: Some(Duration::from_secs(1)),
                resync_interval: None,
            }),
            deploy: Some(Deploy {
                command: Some("/bin/false".to_string()),
                pull: None,
            }),
            shutdown: Some(Shutdown {
                graceful_timeout: Some(Duration::from_secs(5)),
            }),
        },
    }
}
