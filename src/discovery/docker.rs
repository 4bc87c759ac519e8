//! Docker-backed discovery.
//!
//! A service is deployable when its container carries the access-token label
//! plus the compose labels identifying the service name and config file. One
//! `docker container ls` invocation reports all of them, one record per line
//! with three tab-separated label values.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::trace;

use crate::config::{Config, ConfigTrait};
use crate::model::ServiceRecord;

use super::{Discovery, DiscoveryError};

const COMPOSE_SERVICE_LABEL: &str = "com.docker.compose.service";
const COMPOSE_CONFIG_LABEL: &str = "com.docker.compose.project.config_files";
const COMPOSE_ONEOFF_LABEL: &str = "com.docker.compose.oneoff";

pub struct DockerDiscovery {
    docker_bin: String,
    token_label: String,
}

impl DockerDiscovery {
    pub fn new(cfg: &Config) -> Self {
        let discovery = cfg.discovery();
        Self {
            docker_bin: discovery
                .and_then(|d| d.docker_bin.clone())
                .unwrap_or_else(|| "docker".to_string()),
            token_label: discovery
                .and_then(|d| d.token_label.clone())
                .unwrap_or_else(|| "deployd.token".to_string()),
        }
    }

    fn format_arg(&self) -> String {
        format!(
            "{{{{ .Label \"{}\" }}}}\t{{{{ .Label \"{}\" }}}}\t{{{{ .Label \"{}\" }}}}",
            COMPOSE_SERVICE_LABEL, COMPOSE_CONFIG_LABEL, self.token_label
        )
    }
}

#[async_trait]
impl Discovery for DockerDiscovery {
    async fn list_services(&self) -> Result<Vec<ServiceRecord>, DiscoveryError> {
        let output = Command::new(&self.docker_bin)
            .args([
                "container",
                "ls",
                "--all",
                "--filter",
                &format!("label={}", self.token_label),
                "--filter",
                &format!("label={}", COMPOSE_SERVICE_LABEL),
                "--filter",
                &format!("label={}=False", COMPOSE_ONEOFF_LABEL),
                "--format",
                &self.format_arg(),
            ])
            .output()
            .await?;

        if !output.status.success() {
            return Err(DiscoveryError::CommandFailed {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(parse_records(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parses discovery output: one record per line, exactly three
/// whitespace-separated fields; anything else is skipped.
pub fn parse_records(output: &str) -> Vec<ServiceRecord> {
    let mut records = Vec::new();
    for line in output.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 3 {
            if !line.trim().is_empty() {
                trace!(
                    component = "discovery",
                    event = "record_skipped",
                    line = line,
                    "malformed discovery record skipped"
                );
            }
            continue;
        }
        records.push(ServiceRecord {
            name: fields[0].to_string(),
            deploy_file: fields[1].to_string(),
            token: fields[2].to_string(),
        });
    }
    records
}
