// HTTP API controllers.

pub mod controller;
pub mod deploy;
pub mod metrics;
pub mod probe;

// Re-export controller types for convenience
pub use deploy::DeployController;
pub use metrics::PrometheusMetricsController;
pub use probe::LivenessProbeController;
