use std::sync::Arc;

use axum::{
    Router,
    body::Body as AxumBody,
    extract::State,
    http::{StatusCode, header},
    middleware,
    routing::{any, get},
};
use eyre::{Result, WrapErr};
use hyper::{Request, Response};
use tower_http::trace::TraceLayer;

use crate::{
    adapters::middleware::{request_id_middleware, request_timing_middleware},
    core::RelayService,
};

/// Inbound HTTP surface of the relay.
///
/// Every method under the prefix goes through one entry point; the method
/// travels with the request as data.
#[derive(Clone)]
pub struct HttpHandler {
    relay: Arc<RelayService>,
}

impl HttpHandler {
    pub fn new(relay: Arc<RelayService>) -> Self {
        Self { relay }
    }

    /// Axum router: `{prefix}/{*path}` for all methods plus the local health endpoint.
    pub fn router(&self) -> Router {
        let mut app = Router::new().route(
            &self.relay.router().route_pattern(),
            any(
                |State(handler): State<HttpHandler>, req: Request<AxumBody>| async move {
                    handler.handle_request(req).await
                },
            ),
        );

        let health = &self.relay.config().health;
        if health.enabled {
            app = app.route(
                &health.path,
                get(|State(handler): State<HttpHandler>| async move {
                    match handler.handle_health_check().await {
                        Ok(response) => response,
                        Err(e) => {
                            tracing::error!("Health check handling error: {:?}", e);
                            let mut response =
                                Response::new(AxumBody::from("Internal Server Error"));
                            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                            response
                        }
                    }
                }),
            );
        }

        app.with_state(self.clone())
            .layer(middleware::from_fn(request_timing_middleware))
            .layer(middleware::from_fn(request_id_middleware))
            .layer(TraceLayer::new_for_http())
    }

    /// Relay a request matched by the prefix route.
    pub async fn handle_request(&self, req: Request<AxumBody>) -> Response<AxumBody> {
        tracing::debug!("Handling {} request to {}", req.method(), req.uri().path());
        self.relay.relay(req).await
    }

    /// Local liveness, optionally with an origin probe.
    async fn handle_health_check(&self) -> Result<Response<AxumBody>> {
        let health = &self.relay.config().health;

        let origin_reachable = if health.probe_origin {
            let probe_url = self.relay.health_probe_url();
            let reachable = match self
                .relay
                .client()
                .health_check(&probe_url, health.timeout_secs)
                .await
            {
                Ok(reachable) => reachable,
                Err(e) => {
                    tracing::warn!("Origin health probe to {} failed: {}", probe_url, e);
                    false
                }
            };
            Some(reachable)
        } else {
            None
        };

        let status = if origin_reachable == Some(false) {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::OK
        };

        let health_data = serde_json::json!({
            "status": if status == StatusCode::OK { "healthy" } else { "degraded" },
            "version": env!("CARGO_PKG_VERSION"),
            "origin": self.relay.origin(),
            "origin_reachable": origin_reachable,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "application/json")
            .body(AxumBody::from(health_data.to_string()))
            .wrap_err("Failed to build health check response")
    }
}
