// Domain types shared across the coordinator, runner and registry.

pub mod event;
pub mod service;

pub use event::{Event, QUEUED_NOTICE};
pub use service::{DeploySpec, ServiceEntry, ServiceRecord};
