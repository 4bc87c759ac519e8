// Configuration loading and management.

pub mod test_config;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::model::DeploySpec;

pub use test_config::new_test_config;

pub const PROD: &str = "prod";
#[allow(dead_code)]
pub const DEV: &str = "dev";
#[allow(dead_code)]
pub const TEST: &str = "test";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(rename = "deployd")]
    pub deployd: DeploydBox,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeploydBox {
    pub env: String,
    pub logs: Option<Logs>,
    pub api: Option<Api>,
    pub discovery: Option<DiscoveryCfg>,
    pub deploy: Option<Deploy>,
    pub shutdown: Option<Shutdown>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Logs {
    pub level: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Api {
    pub name: Option<String>,
    pub port: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscoveryCfg {
    /// Docker binary used for container discovery.
    pub docker_bin: Option<String>,
    /// Container label carrying the per-service access token.
    pub token_label: Option<String>,
    /// How many missed lookups may trigger an on-demand discovery pass
    /// per `refresh_window`.
    pub refresh_limit: Option<u32>,
    #[serde(with = "humantime_serde", default)]
    pub refresh_window: Option<Duration>,
    /// Periodic background re-synchronization interval; disabled when unset.
    #[serde(with = "humantime_serde", default)]
    pub resync_interval: Option<Duration>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Deploy {
    /// Orchestration command invoked per run.
    pub command: Option<String>,
    /// Image pull policy passed as `--pull <value>`; omitted when unset.
    pub pull: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Shutdown {
    #[serde(with = "humantime_serde", default)]
    pub graceful_timeout: Option<Duration>,
}

/// Accessor trait over the configuration sections.
pub trait ConfigTrait {
    fn env(&self) -> &str;
    fn is_prod(&self) -> bool;
    fn logs(&self) -> Option<&Logs>;
    fn api(&self) -> Option<&Api>;
    fn discovery(&self) -> Option<&DiscoveryCfg>;
    fn deploy(&self) -> Option<&Deploy>;
    fn shutdown(&self) -> Option<&Shutdown>;
}

impl ConfigTrait for Config {
    fn env(&self) -> &str {
        &self.deployd.env
    }

    fn is_prod(&self) -> bool {
        self.deployd.env == PROD
    }

    fn logs(&self) -> Option<&Logs> {
        self.deployd.logs.as_ref()
    }

    fn api(&self) -> Option<&Api> {
        self.deployd.api.as_ref()
    }

    fn discovery(&self) -> Option<&DiscoveryCfg> {
        self.deployd.discovery.as_ref()
    }

    fn deploy(&self) -> Option<&Deploy> {
        self.deployd.deploy.as_ref()
    }

    fn shutdown(&self) -> Option<&Shutdown> {
        self.deployd.shutdown.as_ref()
    }
}

impl Config {
    /// Loads the configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        let cfg: Config = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {:?}", path))?;
        Ok(cfg)
    }

    /// Builds the deployment invocation for one service.
    ///
    /// The command receives the deploy file and the service name, matching
    /// the orchestration contract: `<command> -f <file> up [--pull <policy>] -d <service>`.
    pub fn deploy_spec(&self, service: &str, deploy_file: &str) -> DeploySpec {
        let deploy = self.deploy();
        let command = deploy
            .and_then(|d| d.command.clone())
            .unwrap_or_else(|| "docker-compose".to_string());

        let mut args = vec!["-f".to_string(), deploy_file.to_string(), "up".to_string()];
        if let Some(pull) = deploy.and_then(|d| d.pull.clone()) {
            args.push("--pull".to_string());
            args.push(pull);
        }
        args.push("-d".to_string());
        args.push(service.to_string());

        DeploySpec { command, args }
    }
}
