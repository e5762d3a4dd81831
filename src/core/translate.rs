//! Inbound request → outbound request translation.
//!
//! Only a closed allow-list of headers crosses the boundary, the target URL
//! is rebuilt from the origin base and the captured path, and the body is
//! read according to a policy picked once from the inbound `content-type`.
use axum::body::Body as AxumBody;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request, header};
use url::Url;

use crate::{
    config::ForwardingConfig,
    core::{error::RelayError, router::CapturedPath},
};

/// Inbound headers copied onto the outbound request. Nothing else is forwarded.
pub const FORWARDED_REQUEST_HEADERS: [HeaderName; 4] = [
    header::CONTENT_TYPE,
    header::AUTHORIZATION,
    header::ACCEPT,
    header::ACCEPT_LANGUAGE,
];

/// How the inbound body is read and forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyPolicy {
    /// `application/json`: read and forwarded as text
    Json,
    /// `multipart/form-data`: raw bytes, content-type re-declared verbatim
    Multipart,
    /// Anything else (including no content-type): read and forwarded as text
    Text,
    /// Anything else with binary passthrough enabled: raw bytes
    Opaque,
}

impl BodyPolicy {
    /// Case-insensitive substring match on the raw content-type value.
    pub fn from_content_type(content_type: Option<&str>, binary_passthrough: bool) -> Self {
        let content_type = content_type.unwrap_or_default().to_ascii_lowercase();
        if content_type.contains("application/json") {
            Self::Json
        } else if content_type.contains("multipart/form-data") {
            Self::Multipart
        } else if binary_passthrough {
            Self::Opaque
        } else {
            Self::Text
        }
    }

    pub fn reads_binary(self) -> bool {
        matches!(self, Self::Multipart | Self::Opaque)
    }

    /// Multipart bodies carry their boundary in the content-type parameter.
    pub fn redeclares_content_type(self) -> bool {
        self == Self::Multipart
    }
}

/// Outbound body in the shape it was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundBody {
    Empty,
    Text(String),
    Binary(Bytes),
}

impl OutboundBody {
    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Text(text) => text.len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_axum_body(self) -> AxumBody {
        match self {
            Self::Empty => AxumBody::empty(),
            Self::Text(text) => AxumBody::from(text),
            Self::Binary(bytes) => AxumBody::from(bytes),
        }
    }
}

/// A request ready to be issued against the origin.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: OutboundBody,
}

/// Builds outbound requests against a fixed origin.
#[derive(Debug, Clone)]
pub struct RequestTranslator {
    origin: Url,
    binary_passthrough: bool,
    max_body_bytes: Option<usize>,
}

impl RequestTranslator {
    pub fn new(origin: &str, forwarding: &ForwardingConfig) -> Result<Self, RelayError> {
        let origin = Url::parse(origin)
            .map_err(|e| RelayError::InvalidTarget(format!("origin '{origin}': {e}")))?;
        if origin.cannot_be_a_base() {
            return Err(RelayError::InvalidTarget(format!(
                "origin '{origin}' cannot be a base URL"
            )));
        }

        Ok(Self {
            origin,
            binary_passthrough: forwarding.binary_passthrough,
            max_body_bytes: forwarding.max_body_bytes,
        })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Origin base with its path replaced by `/api/<captured>` and the inbound
    /// query pairs appended in iteration order.
    pub fn target_url(&self, captured: &CapturedPath, query: Option<&str>) -> Url {
        let mut url = self.origin.clone();
        url.set_path(&captured.upstream_path());
        url.set_query(None);
        url.set_fragment(None);

        let pairs: Vec<(String, String)> = query
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        url
    }

    /// Copy the allow-listed headers that are present. Absent headers are not
    /// forwarded as empty values.
    pub fn forwarded_headers(inbound: &HeaderMap) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for name in &FORWARDED_REQUEST_HEADERS {
            for value in inbound.get_all(name) {
                headers.append(name.clone(), value.clone());
            }
        }
        headers
    }

    /// Translate an inbound request whose path has already been captured.
    pub async fn translate(
        &self,
        req: Request<AxumBody>,
        captured: &CapturedPath,
    ) -> Result<OutboundRequest, RelayError> {
        let (parts, body) = req.into_parts();

        let url = self.target_url(captured, parts.uri.query());
        let mut headers = Self::forwarded_headers(&parts.headers);

        if parts.method == Method::GET || parts.method == Method::HEAD {
            return Ok(OutboundRequest {
                method: parts.method,
                url,
                headers,
                body: OutboundBody::Empty,
            });
        }

        let content_type: Option<HeaderValue> = parts.headers.get(header::CONTENT_TYPE).cloned();
        let policy = BodyPolicy::from_content_type(
            content_type.as_ref().and_then(|v| v.to_str().ok()),
            self.binary_passthrough,
        );

        let bytes = axum::body::to_bytes(body, self.max_body_bytes.unwrap_or(usize::MAX))
            .await
            .map_err(|e| RelayError::MalformedInboundBody(e.to_string()))?;

        let body = if policy.reads_binary() {
            OutboundBody::Binary(bytes)
        } else {
            OutboundBody::Text(String::from_utf8_lossy(&bytes).into_owned())
        };

        if policy.redeclares_content_type() {
            if let Some(original) = content_type {
                headers.insert(header::CONTENT_TYPE, original);
            }
        }

        Ok(OutboundRequest {
            method: parts.method,
            url,
            headers,
            body,
        })
    }
}
