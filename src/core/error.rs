use thiserror::Error;

use crate::ports::http_client::HttpClientError;

/// Failures on the relay path. Everything except `RouteNotFound` is answered
/// with the same 502 payload.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RelayError {
    /// Path is outside the forwarded prefix
    #[error("No route for path {0}")]
    RouteNotFound(String),

    /// The origin could not be reached or the exchange did not complete
    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(#[from] HttpClientError),

    /// The inbound body could not be read
    #[error("Malformed inbound body: {0}")]
    MalformedInboundBody(String),

    /// The origin base URL could not be combined with the captured path
    #[error("Invalid target URL: {0}")]
    InvalidTarget(String),
}

impl RelayError {
    /// Short label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RouteNotFound(_) => "route_not_found",
            Self::UpstreamUnreachable(e) => e.kind(),
            Self::MalformedInboundBody(_) => "malformed_body",
            Self::InvalidTarget(_) => "invalid_target",
        }
    }
}
