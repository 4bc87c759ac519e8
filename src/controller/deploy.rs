//! Deployment trigger controller.
//!
//! One route serves every service: any method on `/{service}` triggers (or
//! joins) a deployment and streams its live output back. Authorization
//! failures are reported as not-found so unauthenticated probes cannot tell
//! a protected service from a missing one.

use axum::body::Body;
use axum::extract::Path;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::http::auth;
use crate::http::body::EventBody;
use crate::http::Controller;
use crate::rate::RefreshLimiter;
use crate::registry::Registry;

pub struct DeployController {
    registry: Arc<Registry>,
    refresh_limiter: Arc<RefreshLimiter>,
}

impl DeployController {
    /// Creates a new deployment trigger controller.
    pub fn new(registry: Arc<Registry>, refresh_limiter: Arc<RefreshLimiter>) -> Self {
        Self {
            registry,
            refresh_limiter,
        }
    }

    async fn handle(&self, service: String, headers: HeaderMap) -> Response {
        info!(
            component = "deploy",
            event = "request",
            service = %service,
            "handling deployment trigger"
        );

        // The service may have been added since the last sync; refresh at
        // most refresh_limit times per window so misses cannot hammer the
        // discovery source.
        let mut entry = self.registry.lookup(&service).await;
        if entry.is_none() && self.refresh_limiter.allow() {
            if let Err(e) = self.registry.sync().await {
                warn!(
                    component = "deploy",
                    event = "refresh_failed",
                    service = %service,
                    error = %e,
                    "on-demand registry refresh failed, degrading to not-found"
                );
            }
            entry = self.registry.lookup(&service).await;
        }
        let Some(entry) = entry else {
            return StatusCode::NOT_FOUND.into_response();
        };

        if !auth::token_matches(auth::bearer_token(&headers), &entry.token) {
            // 404 instead of 403 to reduce exposure.
            return StatusCode::NOT_FOUND.into_response();
        }

        // The service may have been removed since the last sync; a failed
        // refresh here is absorbed, the registry just keeps its last state.
        if let Err(e) = self.registry.sync().await {
            warn!(
                component = "deploy",
                event = "refresh_failed",
                service = %service,
                error = %e,
                "pre-dispatch registry refresh failed"
            );
        }
        let Some(entry) = self.registry.lookup(&service).await else {
            return StatusCode::GONE.into_response();
        };

        let events = match entry.coordinator.attach().await {
            Ok(events) => events,
            // Lost the race against deregistration after the re-check.
            Err(_) => return StatusCode::GONE.into_response(),
        };

        match Response::builder()
            .status(StatusCode::OK)
            .header(header::TRAILER, "Exit-Code")
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(Body::new(EventBody::new(events)))
        {
            Ok(response) => response,
            Err(e) => {
                error!(
                    component = "deploy",
                    event = "response_build_failed",
                    service = %service,
                    error = %e,
                    "failed to build streaming response"
                );
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

impl Controller for DeployController {
    fn add_route(&self, router: Router) -> Router {
        let controller = Arc::new(self.clone());
        router.route(
            "/:service",
            any(move |Path(service): Path<String>, headers: HeaderMap| {
                let controller = controller.clone();
                async move { controller.handle(service, headers).await }
            }),
        )
    }
}

impl Clone for DeployController {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            refresh_limiter: self.refresh_limiter.clone(),
        }
    }
}
