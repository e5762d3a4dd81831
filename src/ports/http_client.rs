use async_trait::async_trait;
use bytes::Bytes;
use hyper::{HeaderMap, StatusCode, ext::ReasonPhrase};
use thiserror::Error;

use crate::core::translate::OutboundRequest;

/// Custom error type for upstream client operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpClientError {
    /// Error when the origin cannot be reached or the exchange breaks off
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error when request times out
    #[error("Timeout error after {0} seconds")]
    Timeout(u64),

    /// Error when request is invalid
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Error while reading the origin's response body
    #[error("Body error: {0}")]
    BodyError(String),
}

impl HttpClientError {
    /// Short label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionError(_) => "connection",
            Self::Timeout(_) => "timeout",
            Self::InvalidRequest(_) => "invalid_request",
            Self::BodyError(_) => "body",
        }
    }
}

/// Result type alias for upstream client operations
pub type HttpClientResult<T> = Result<T, HttpClientError>;

/// A fully received origin response. Any status, including 4xx/5xx.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    /// Non-canonical status text sent by the origin, if any
    pub reason: Option<ReasonPhrase>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            reason: None,
            headers,
            body,
        }
    }
}

/// UpstreamClient defines the port (interface) for calling the origin
#[async_trait]
pub trait UpstreamClient: Send + Sync + 'static {
    /// Issue the translated request and buffer the full response.
    ///
    /// A response with any status code is `Ok`; only failures to complete the
    /// exchange are errors.
    async fn send(&self, req: OutboundRequest) -> HttpClientResult<UpstreamResponse>;

    /// Perform a HEAD probe against `url`
    ///
    /// # Returns
    /// `Ok(true)` for a 2xx answer, `Ok(false)` for any other answer or a
    /// connection failure, `Err` on timeout
    async fn health_check(&self, url: &str, timeout_secs: u64) -> HttpClientResult<bool>;
}
