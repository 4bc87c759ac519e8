//! Service registry and its synchronization against the discovery source.
//!
//! The registry is the one structure shared between request handling and
//! synchronization. Lookups clone a whole entry out under the read lock, so
//! a reader always observes a consistent snapshot; a lookup racing a
//! deregistration either finds the entry or does not, never a partially
//! torn-down one.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::Config;
use crate::coordinator::CoordinatorHandle;
use crate::discovery::{Discovery, DiscoveryError};
use crate::metrics as metric_names;
use crate::model::ServiceEntry;

pub struct Registry {
    cfg: Config,
    discovery: Arc<dyn Discovery>,
    entries: RwLock<HashMap<String, ServiceEntry>>,
}

impl Registry {
    pub fn new(cfg: Config, discovery: Arc<dyn Discovery>) -> Arc<Self> {
        Arc::new(Self {
            cfg,
            discovery,
            entries: RwLock::new(HashMap::new()),
        })
    }

    /// Returns a snapshot of the entry for `name`, if registered.
    pub async fn lookup(&self, name: &str) -> Option<ServiceEntry> {
        self.entries.read().await.get(name).cloned()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Synchronizes the registry against the discovery source.
    ///
    /// Newly discovered services get an entry and a freshly spawned
    /// coordinator; known services have their metadata updated in place, the
    /// coordinator identity is preserved so in-flight observers are never
    /// orphaned; vanished services are deregistered and their coordinators
    /// signalled to retire (an in-flight run finishes for already-attached
    /// observers). Idempotent: unchanged discovery output changes nothing.
    pub async fn sync(&self) -> Result<(), DiscoveryError> {
        metrics::counter!(metric_names::REGISTRY_SYNCS).increment(1);

        // Query before taking the write lock; discovery is the slow part and
        // lookups should not stall behind it.
        let records = match self.discovery.list_services().await {
            Ok(records) => records,
            Err(e) => {
                metrics::counter!(metric_names::REGISTRY_SYNC_FAILURES).increment(1);
                return Err(e);
            }
        };

        let mut entries = self.entries.write().await;
        let mut seen: HashSet<String> = HashSet::with_capacity(records.len());

        for record in records {
            seen.insert(record.name.clone());

            match entries.get_mut(&record.name) {
                Some(entry) => {
                    if entry.deploy_file == record.deploy_file && entry.token == record.token {
                        continue;
                    }
                    entry.deploy_file = record.deploy_file.clone();
                    entry.token = record.token;
                    entry
                        .spec
                        .store(Arc::new(self.cfg.deploy_spec(&record.name, &record.deploy_file)));
                    debug!(
                        component = "registry",
                        event = "service_updated",
                        service = %record.name,
                        "service metadata refreshed"
                    );
                }
                None => {
                    let spec = Arc::new(ArcSwap::from_pointee(
                        self.cfg.deploy_spec(&record.name, &record.deploy_file),
                    ));
                    let coordinator = CoordinatorHandle::spawn(record.name.clone(), spec.clone());
                    entries.insert(
                        record.name.clone(),
                        ServiceEntry {
                            name: record.name.clone(),
                            deploy_file: record.deploy_file,
                            token: record.token,
                            spec,
                            coordinator,
                        },
                    );
                    info!(
                        component = "registry",
                        event = "service_registered",
                        service = %record.name,
                        "service configured"
                    );
                }
            }
        }

        let vanished: Vec<String> = entries
            .keys()
            .filter(|name| !seen.contains(*name))
            .cloned()
            .collect();
        for name in vanished {
            if let Some(entry) = entries.remove(&name) {
                entry.coordinator.shutdown();
                info!(
                    component = "registry",
                    event = "service_deregistered",
                    service = %name,
                    "service unmounted"
                );
            }
        }

        Ok(())
    }

    /// Retires every coordinator. Used at process shutdown; in-flight runs
    /// are allowed to finish within the graceful window.
    pub async fn shutdown_all(&self) {
        let mut entries = self.entries.write().await;
        for (_, entry) in entries.drain() {
            entry.coordinator.shutdown();
        }
    }
}
