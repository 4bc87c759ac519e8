// Discovery source: which services exist, and their deploy metadata.

pub mod docker;

use async_trait::async_trait;

use crate::model::ServiceRecord;

pub use docker::DockerDiscovery;

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("failed to run discovery command: {0}")]
    Io(#[from] std::io::Error),
    #[error("discovery command exited with code {code}: {stderr}")]
    CommandFailed { code: i32, stderr: String },
}

/// External source of truth for the set of deployable services.
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Returns the current set of services with their deploy metadata.
    async fn list_services(&self) -> Result<Vec<ServiceRecord>, DiscoveryError>;
}
