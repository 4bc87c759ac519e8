//! Service registry entry model.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::coordinator::CoordinatorHandle;

/// One record reported by the discovery source: a deployable service, the
/// compose file it is deployed from and the bearer token that authorizes
/// triggering it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    pub name: String,
    pub deploy_file: String,
    pub token: String,
}

/// Fully resolved deployment invocation for one service.
///
/// Rebuilt by the registry whenever discovery reports changed metadata and
/// swapped in atomically; the coordinator loads it at the start of each run,
/// so a metadata refresh takes effect on the next run without replacing the
/// coordinator task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploySpec {
    pub command: String,
    pub args: Vec<String>,
}

/// Registry entry for a known service.
///
/// Cloned out of the registry under its read lock, so a caller always holds
/// a consistent snapshot. The coordinator handle is created once per service
/// name and survives metadata refreshes; only deregistration retires it.
#[derive(Clone)]
pub struct ServiceEntry {
    pub name: String,
    pub deploy_file: String,
    pub token: String,
    pub spec: Arc<ArcSwap<DeploySpec>>,
    pub coordinator: CoordinatorHandle,
}
