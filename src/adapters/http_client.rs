use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body as AxumBody;
use eyre::Result;
use http_body_util::BodyExt;
use hyper::{Request, Uri, Version, ext::ReasonPhrase};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use rustls_native_certs::load_native_certs;
use tokio::time::timeout;
use tracing::Instrument;

use crate::{
    config::UpstreamConfig,
    core::translate::OutboundRequest,
    ports::http_client::{HttpClientError, HttpClientResult, UpstreamClient, UpstreamResponse},
};

/// Origin client adapter using Hyper with Rustls (plain HTTP or HTTPS origins).
///
/// Responsibilities:
/// * Issues the translated request with the inbound method, headers and body untouched
/// * Buffers the full origin response so it can be relayed byte for byte
/// * Applies the optional per-call timeout from configuration
/// * Performs HEAD based health probes with timeout
///
/// No retries: a failed call is reported once and turned into a 502 upstream.
pub struct HttpClientAdapter {
    client: Client<HttpsConnector<HttpConnector>, AxumBody>,
    timeout_secs: Option<u64>,
}

impl HttpClientAdapter {
    /// Create a new HTTP client adapter.
    pub fn new(upstream: &UpstreamConfig) -> Result<Self> {
        // Install default crypto provider for rustls if not already set
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let mut http_connector = HttpConnector::new();
        http_connector.enforce_http(false); // Allow HTTPS URLs

        let mut root_cert_store = rustls::RootCertStore::empty();
        let native_certs = load_native_certs();

        if !native_certs.certs.is_empty() {
            for cert in native_certs.certs {
                if root_cert_store.add(cert).is_err() {
                    tracing::warn!("Failed to add native certificate to rustls RootCertStore");
                }
            }
            tracing::debug!("Loaded {} native root certificates.", root_cert_store.len());
        }

        if !native_certs.errors.is_empty() {
            tracing::warn!(
                "Some native certificates failed to load: {:?}",
                native_certs.errors
            );
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_cert_store)
            .with_no_client_auth();

        let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector);

        let client = Client::builder(TokioExecutor::new()).build::<_, AxumBody>(https_connector);

        tracing::info!(
            "Created origin HTTP client (timeout: {})",
            upstream
                .timeout_secs
                .map_or_else(|| "transport default".to_string(), |s| format!("{s}s"))
        );
        Ok(Self {
            client,
            timeout_secs: upstream.timeout_secs,
        })
    }

    /// Convert the translated request into a hyper request.
    fn build_request(req: OutboundRequest) -> HttpClientResult<Request<AxumBody>> {
        let OutboundRequest {
            method,
            url,
            headers,
            body,
        } = req;

        let uri: Uri = url
            .as_str()
            .parse()
            .map_err(|e| HttpClientError::InvalidRequest(format!("{url}: {e}")))?;
        if uri.host().is_none() {
            return Err(HttpClientError::InvalidRequest(format!(
                "Outgoing URI has no host: {uri}"
            )));
        }

        let mut request = Request::new(body.into_axum_body());
        *request.method_mut() = method;
        *request.uri_mut() = uri;
        *request.version_mut() = Version::HTTP_11;
        *request.headers_mut() = headers;
        Ok(request)
    }

    async fn exchange(&self, request: Request<AxumBody>) -> HttpClientResult<UpstreamResponse> {
        let method = request.method().clone();
        let uri = request.uri().clone();

        let response = self.client.request(request).await.map_err(|e| {
            let cause = std::error::Error::source(&e)
                .map(|source| format!(": {source}"))
                .unwrap_or_default();
            HttpClientError::ConnectionError(format!("Request to {method} {uri} failed: {e}{cause}"))
        })?;

        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| HttpClientError::BodyError(format!("Reading response from {uri}: {e}")))?
            .to_bytes();

        Ok(UpstreamResponse {
            status: parts.status,
            reason: parts.extensions.get::<ReasonPhrase>().cloned(),
            headers: parts.headers,
            body,
        })
    }
}

#[async_trait]
impl UpstreamClient for HttpClientAdapter {
    async fn send(&self, req: OutboundRequest) -> HttpClientResult<UpstreamResponse> {
        let span = tracing::info_span!(
            "backend_request",
            backend.url = %req.url,
            http.method = %req.method,
            http.status_code = tracing::field::Empty,
        );

        async move {
            let request = Self::build_request(req)?;
            tracing::debug!("Outgoing request headers: {:?}", request.headers());

            let result = match self.timeout_secs {
                Some(secs) => timeout(Duration::from_secs(secs), self.exchange(request))
                    .await
                    .map_err(|_| HttpClientError::Timeout(secs))
                    .and_then(|result| result),
                None => self.exchange(request).await,
            };

            match &result {
                Ok(response) => {
                    tracing::Span::current().record("http.status_code", response.status.as_u16());
                    tracing::info!(
                        "Origin answered {} ({} bytes)",
                        response.status,
                        response.body.len()
                    );
                }
                Err(e) => {
                    tracing::Span::current().record("http.status_code", 599u16);
                    tracing::warn!("Origin call failed: {}", e);
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn health_check(&self, url: &str, timeout_secs: u64) -> HttpClientResult<bool> {
        let request = Request::builder()
            .method("HEAD")
            .uri(url)
            .version(Version::HTTP_11)
            .body(AxumBody::empty())
            .map_err(|e| HttpClientError::InvalidRequest(e.to_string()))?;

        tracing::debug!("Health checking URL: {}", url);
        let timeout_duration = Duration::from_secs(timeout_secs);

        match timeout(timeout_duration, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let is_healthy = response.status().is_success();
                // Consume the body to prevent resource leaks
                let _ = response.into_body().collect().await;
                tracing::debug!("Health check for {} result: {}", url, is_healthy);
                Ok(is_healthy)
            }
            Ok(Err(err)) => {
                tracing::debug!("Health check error for {}: {}", url, err);
                Ok(false)
            }
            Err(_) => {
                tracing::debug!("Health check timeout for {}", url);
                Err(HttpClientError::Timeout(timeout_secs))
            }
        }
    }
}
