// Liveness probe controller.

use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};

use crate::http::Controller;

pub const LIVENESS_PROBE_PATH: &str = "/healthz";

const SUCCESS_RESPONSE: &str = r#"{
  "status": 200,
  "message": "deployd is up"
}"#;

/// LivenessProbeController answers container/orchestrator health checks.
pub struct LivenessProbeController;

impl LivenessProbeController {
    /// Creates a new liveness probe controller.
    pub fn new() -> Self {
        Self
    }

    async fn probe() -> impl IntoResponse {
        (
            StatusCode::OK,
            [("content-type", "application/json")],
            SUCCESS_RESPONSE,
        )
    }
}

impl Default for LivenessProbeController {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller for LivenessProbeController {
    fn add_route(&self, router: Router) -> Router {
        router.route(LIVENESS_PROBE_PATH, get(Self::probe))
    }
}
