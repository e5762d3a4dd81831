//! Request relay orchestration.
//!
//! `RelayService` holds the immutable configuration resolved at startup and
//! drives one request through routing, translation, the origin call and
//! response translation. It keeps no per-request state, so a single instance
//! is shared by every connection.
use std::sync::Arc;

use axum::body::Body as AxumBody;
use hyper::{Request, Response, StatusCode};

use crate::{
    config::RelayConfig,
    core::{
        error::RelayError,
        response::{ProxyErrorResponse, ResponseTranslator},
        router::{CapturedPath, PathRouter},
        translate::RequestTranslator,
    },
    metrics::{RequestTimer, increment_request_total, increment_upstream_failure},
    ports::http_client::UpstreamClient,
};

pub struct RelayService {
    config: Arc<RelayConfig>,
    origin: String,
    router: PathRouter,
    translator: RequestTranslator,
    client: Arc<dyn UpstreamClient>,
}

impl RelayService {
    /// Resolve the origin once and build the translators.
    pub fn new(
        config: Arc<RelayConfig>,
        client: Arc<dyn UpstreamClient>,
    ) -> Result<Self, RelayError> {
        let origin = config.origin_url();
        let translator = RequestTranslator::new(&origin, &config.forwarding)?;
        let router = PathRouter::new(config.route_prefix.clone());

        tracing::info!(
            "Relaying {}/* to origin {}",
            router.prefix().trim_end_matches('/'),
            origin
        );

        Ok(Self {
            config,
            origin,
            router,
            translator,
            client,
        })
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// The origin base URL selected at construction.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn router(&self) -> &PathRouter {
        &self.router
    }

    pub fn client(&self) -> &Arc<dyn UpstreamClient> {
        &self.client
    }

    /// Origin URL probed by the local health endpoint.
    pub fn health_probe_url(&self) -> String {
        let mut url = self.translator.origin().clone();
        url.set_path(&self.config.health.upstream_path);
        url.set_query(None);
        url.set_fragment(None);
        url.to_string()
    }

    /// Relay one inbound request. Never fails: transport and translation
    /// errors become the 502 payload.
    pub async fn relay(&self, req: Request<AxumBody>) -> Response<AxumBody> {
        let method = req.method().clone();
        let _timer = RequestTimer::new(method.as_str());

        let Some(captured) = self.router.capture(req.uri().path()) else {
            let path = req.uri().path().to_string();
            tracing::debug!("No relay route for {}", path);
            return Self::not_found(RelayError::RouteNotFound(path));
        };

        let response = match self.forward(req, &captured).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    error.kind = e.kind(),
                    "Failed to proxy {} to {}: {}",
                    captured.upstream_path(),
                    self.origin,
                    e
                );
                increment_upstream_failure(e.kind());
                ProxyErrorResponse::default().into_response()
            }
        };

        increment_request_total(method.as_str(), response.status().as_u16());
        response
    }

    /// Translation strictly precedes the origin call, which completes before
    /// the response is translated.
    async fn forward(
        &self,
        req: Request<AxumBody>,
        captured: &CapturedPath,
    ) -> Result<Response<AxumBody>, RelayError> {
        let outbound = self.translator.translate(req, captured).await?;

        tracing::debug!(
            "Forwarding {} {} ({} body bytes)",
            outbound.method,
            outbound.url,
            outbound.body.len()
        );

        let upstream = self.client.send(outbound).await?;
        Ok(ResponseTranslator::translate(upstream))
    }

    fn not_found(e: RelayError) -> Response<AxumBody> {
        let mut response = Response::new(AxumBody::from(e.to_string()));
        *response.status_mut() = StatusCode::NOT_FOUND;
        response
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bytes::Bytes;
    use http_body_util::BodyExt;
    use hyper::{HeaderMap, Method, header, header::HeaderValue};

    use super::*;
    use crate::{
        core::translate::{OutboundBody, OutboundRequest},
        ports::http_client::{HttpClientError, HttpClientResult, UpstreamResponse},
    };

    /// Records the outbound request and answers with a canned response.
    #[derive(Default)]
    struct RecordingClient {
        seen: Mutex<Option<OutboundRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl UpstreamClient for RecordingClient {
        async fn send(&self, req: OutboundRequest) -> HttpClientResult<UpstreamResponse> {
            *self.seen.lock().unwrap() = Some(req);
            if self.fail {
                return Err(HttpClientError::ConnectionError("refused".to_string()));
            }
            let mut headers = HeaderMap::new();
            headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
            headers.insert("x-origin", HeaderValue::from_static("yes"));
            Ok(UpstreamResponse::new(
                StatusCode::CREATED,
                headers,
                Bytes::from_static(b"created"),
            ))
        }

        async fn health_check(&self, _url: &str, _timeout_secs: u64) -> HttpClientResult<bool> {
            Ok(!self.fail)
        }
    }

    fn service(client: Arc<RecordingClient>) -> RelayService {
        let config = RelayConfig::builder()
            .internal_origin("http://origin.test:8000")
            .build();
        RelayService::new(Arc::new(config), client).unwrap()
    }

    #[tokio::test]
    async fn test_relay_forwards_and_mirrors() {
        let client = Arc::new(RecordingClient::default());
        let relay = service(client.clone());

        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/submissions?draft=1")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, "Bearer abc")
            .header(header::COOKIE, "secret=1")
            .body(AxumBody::from(r#"{"code":"int main(){}"}"#))
            .unwrap();

        let response = relay.relay(req).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get("x-origin").unwrap(), "yes");
        assert!(!response.headers().contains_key(header::CONNECTION));
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"created");

        let seen = client.seen.lock().unwrap().take().unwrap();
        assert_eq!(seen.method, Method::POST);
        assert_eq!(
            seen.url.as_str(),
            "http://origin.test:8000/api/submissions?draft=1"
        );
        assert_eq!(seen.headers.get(header::AUTHORIZATION).unwrap(), "Bearer abc");
        assert!(!seen.headers.contains_key(header::COOKIE));
        assert_eq!(
            seen.body,
            OutboundBody::Text(r#"{"code":"int main(){}"}"#.to_string())
        );
    }

    #[tokio::test]
    async fn test_relay_returns_502_on_transport_failure() {
        let client = Arc::new(RecordingClient {
            fail: true,
            ..RecordingClient::default()
        });
        let relay = service(client);

        let req = Request::builder()
            .uri("/api/problems")
            .body(AxumBody::empty())
            .unwrap();

        let response = relay.relay(req).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let payload: ProxyErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload, ProxyErrorResponse::default());
    }

    #[tokio::test]
    async fn test_relay_rejects_paths_outside_prefix() {
        let client = Arc::new(RecordingClient::default());
        let relay = service(client.clone());

        let req = Request::builder()
            .uri("/dashboard")
            .body(AxumBody::empty())
            .unwrap();

        let response = relay.relay(req).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(client.seen.lock().unwrap().is_none());
    }

    #[test]
    fn test_origin_is_resolved_once() {
        let relay = service(Arc::new(RecordingClient::default()));
        assert_eq!(relay.origin(), "http://origin.test:8000");
        assert_eq!(relay.router().prefix(), "/api");
        assert_eq!(
            relay.health_probe_url(),
            "http://origin.test:8000/api/health"
        );
    }
}
