//! Upstream response → client response translation, plus the fixed 502 payload.
use axum::body::Body as AxumBody;
use http::{HeaderMap, HeaderName, HeaderValue, Response, StatusCode, header};
use serde::{Deserialize, Serialize};

use crate::ports::http_client::UpstreamResponse;

/// Connection-scoped response headers that are never relayed.
pub const HOP_BY_HOP_RESPONSE_HEADERS: [HeaderName; 2] =
    [header::TRANSFER_ENCODING, header::CONNECTION];

pub const UNAVAILABLE_ERROR: &str = "Backend service unavailable";
pub const UNAVAILABLE_DETAIL: &str = "Could not connect to the API server.";

/// Body returned when the origin cannot be reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyErrorResponse {
    pub error: String,
    pub detail: String,
}

impl Default for ProxyErrorResponse {
    fn default() -> Self {
        Self {
            error: UNAVAILABLE_ERROR.to_string(),
            detail: UNAVAILABLE_DETAIL.to_string(),
        }
    }
}

impl ProxyErrorResponse {
    pub const STATUS: StatusCode = StatusCode::BAD_GATEWAY;

    /// 502 with a JSON body and no upstream headers.
    pub fn into_response(self) -> Response<AxumBody> {
        let body = serde_json::to_vec(&self).unwrap_or_else(|_| {
            format!(r#"{{"error":"{UNAVAILABLE_ERROR}","detail":"{UNAVAILABLE_DETAIL}"}}"#)
                .into_bytes()
        });

        let mut response = Response::new(AxumBody::from(body));
        *response.status_mut() = Self::STATUS;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }
}

pub struct ResponseTranslator;

impl ResponseTranslator {
    /// Mirror the origin's status, status text, headers (minus hop-by-hop) and body bytes.
    pub fn translate(upstream: UpstreamResponse) -> Response<AxumBody> {
        let UpstreamResponse {
            status,
            reason,
            headers,
            body,
        } = upstream;

        let mut response = Response::new(AxumBody::from(body));
        *response.status_mut() = status;
        *response.headers_mut() = Self::filter_headers(headers);
        if let Some(reason) = reason {
            response.extensions_mut().insert(reason);
        }
        response
    }

    /// Drop the strip-list; `HeaderName` comparison is already case-insensitive.
    pub fn filter_headers(mut headers: HeaderMap) -> HeaderMap {
        for name in &HOP_BY_HOP_RESPONSE_HEADERS {
            headers.remove(name);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http_body_util::BodyExt;
    use hyper::ext::ReasonPhrase;

    use super::*;

    #[tokio::test]
    async fn test_translate_mirrors_status_headers_and_bytes() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
        headers.insert("x-grader-id", HeaderValue::from_static("g-1"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("close"));

        let payload = Bytes::from_static(&[0x89, 0x50, 0x4e, 0x47, 0xff, 0x00]);
        let upstream = UpstreamResponse::new(StatusCode::IM_A_TEAPOT, headers, payload.clone());

        let response = ResponseTranslator::translate(upstream);

        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(response.headers().get("x-grader-id").unwrap(), "g-1");
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/png"
        );
        assert!(!response.headers().contains_key(header::TRANSFER_ENCODING));
        assert!(!response.headers().contains_key(header::CONNECTION));

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, payload);
    }

    #[test]
    fn test_translate_keeps_reason_phrase() {
        let mut upstream =
            UpstreamResponse::new(StatusCode::OK, HeaderMap::new(), Bytes::new());
        upstream.reason = Some(ReasonPhrase::from_static(b"Graded"));

        let response = ResponseTranslator::translate(upstream);
        let reason = response.extensions().get::<ReasonPhrase>().unwrap();
        assert_eq!(reason.as_bytes(), b"Graded");
    }

    #[tokio::test]
    async fn test_proxy_error_response_shape() {
        let response = ProxyErrorResponse::default().into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(response.headers().len(), 1);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(
            &body[..],
            br#"{"error":"Backend service unavailable","detail":"Could not connect to the API server."}"#
        );
    }
}
