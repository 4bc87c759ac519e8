// Scripted discovery source for tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::discovery::{Discovery, DiscoveryError};
use crate::model::ServiceRecord;

/// In-memory discovery source whose records tests mutate directly.
pub struct StaticDiscovery {
    records: Mutex<Vec<ServiceRecord>>,
    fail: AtomicBool,
}

impl StaticDiscovery {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        })
    }

    /// Adds or replaces the record for `record.name`.
    pub async fn add(&self, record: ServiceRecord) {
        let mut records = self.records.lock().await;
        records.retain(|r| r.name != record.name);
        records.push(record);
    }

    pub async fn remove(&self, name: &str) {
        self.records.lock().await.retain(|r| r.name != name);
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Discovery for StaticDiscovery {
    async fn list_services(&self) -> Result<Vec<ServiceRecord>, DiscoveryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DiscoveryError::CommandFailed {
                code: 1,
                stderr: "discovery unavailable".to_string(),
            });
        }
        Ok(self.records.lock().await.clone())
    }
}

pub fn record(name: &str, deploy_file: &str, token: &str) -> ServiceRecord {
    ServiceRecord {
        name: name.to_string(),
        deploy_file: deploy_file.to_string(),
        token: token.to_string(),
    }
}
