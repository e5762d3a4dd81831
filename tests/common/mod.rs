//! Shared mock origins and relay construction for integration tests.
#![allow(dead_code)]

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use api_relay::{
    HttpClientAdapter, HttpHandler, RelayService,
    config::{HealthConfig, RelayConfig},
};
use axum::{
    Router,
    body::{Body, Bytes, to_bytes},
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode, header},
    response::Response,
    routing::get,
};
use tokio::{io::AsyncWriteExt, net::TcpListener};

/// What the mock origin observed for the last request.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Option<Recorded>>>);

impl Recorder {
    pub fn take(&self) -> Recorded {
        self.0
            .lock()
            .unwrap()
            .take()
            .expect("origin saw no request")
    }
}

/// Bytes that are not valid UTF-8.
pub const BINARY_PAYLOAD: &[u8] = &[0x89, b'P', b'N', b'G', 0x00, 0xff, 0xfe, 0x80];

async fn record_and_echo(State(recorder): State<Recorder>, req: Request) -> Response {
    let (parts, body) = req.into_parts();
    let body = to_bytes(body, usize::MAX).await.unwrap();

    let echo = serde_json::json!({
        "method": parts.method.as_str(),
        "path": parts.uri.path(),
        "body": String::from_utf8_lossy(&body),
    });

    *recorder.0.lock().unwrap() = Some(Recorded {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers: parts.headers,
        body,
    });

    Response::builder()
        .status(StatusCode::CREATED)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-origin", "mock")
        .body(Body::from(echo.to_string()))
        .unwrap()
}

async fn binary() -> Response {
    Response::builder()
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .body(Body::from(BINARY_PAYLOAD))
        .unwrap()
}

async fn not_found() -> Response {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-origin", "mock")
        .body(Body::from(r#"{"detail":"Problem not found"}"#))
        .unwrap()
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(10)).await;
    "too late"
}

/// Start an axum origin that records every request it answers.
pub async fn start_mock_origin() -> (SocketAddr, Recorder) {
    let recorder = Recorder::default();
    let app = Router::new()
        .route("/api/binary", get(binary))
        .route("/api/problems/404", get(not_found))
        .route("/api/slow", get(slow))
        .route("/api/health", get(|| async { "ok" }))
        .fallback(record_and_echo)
        .with_state(recorder.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, recorder)
}

/// Start an origin that writes `raw` verbatim to every connection, for
/// responses a framework would normalise (custom reason phrases, hop-by-hop headers).
pub async fn start_raw_origin(raw: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = tokio::io::AsyncReadExt::read(&mut socket, &mut buf).await;
                let _ = socket.write_all(raw.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

pub fn relay_config(origin: SocketAddr) -> RelayConfig {
    RelayConfig::builder()
        .listen_addr("127.0.0.1:0")
        .internal_origin(format!("http://{origin}"))
        .build()
}

/// The full relay router with the real hyper client.
pub fn relay_app(config: RelayConfig) -> Router {
    let config = Arc::new(config);
    let client = Arc::new(HttpClientAdapter::new(&config.upstream).unwrap());
    let relay = RelayService::new(config, client).unwrap();
    HttpHandler::new(Arc::new(relay)).router()
}

pub fn probing_health() -> HealthConfig {
    HealthConfig {
        probe_origin: true,
        timeout_secs: 2,
        ..HealthConfig::default()
    }
}

pub async fn body_bytes(response: Response) -> Bytes {
    to_bytes(response.into_body(), usize::MAX).await.unwrap()
}
