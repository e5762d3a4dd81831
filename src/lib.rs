//! api-relay - a transparent HTTP forwarding layer for an API origin.
//!
//! The relay accepts any request under a configured path prefix and mirrors it
//! to a single origin service, then mirrors the origin's answer back. It does
//! not interpret payloads; it only has to get the protocol details right:
//!
//! - Path capture after the prefix, rebuilt as `/api/<segments>` on the origin
//! - Query pairs copied onto the target URL
//! - A closed header allow-list inbound (`content-type`, `authorization`,
//!   `accept`, `accept-language`) and a closed strip-list outbound
//!   (`transfer-encoding`, `connection`)
//! - Body framing chosen once from the inbound `content-type`, keeping the
//!   multipart boundary intact
//! - Status, status text and body bytes relayed verbatim
//! - A fixed `502` JSON payload when the origin cannot be reached
//!
//! # Quick Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use api_relay::{HttpClientAdapter, HttpHandler, RelayService};
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let config = Arc::new(api_relay::config::load_config(Some("relay.toml")).await?);
//! let client = Arc::new(HttpClientAdapter::new(&config.upstream)?);
//! let relay = Arc::new(RelayService::new(config, client)?);
//! let app = HttpHandler::new(relay).router();
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! `core` holds the translation logic and has no I/O besides reading the
//! inbound body. `ports` defines the upstream client trait and `adapters`
//! implement it with hyper and expose the inbound surface with axum.
//!
//! # Error Handling
//! Library errors are `thiserror` enums; application plumbing returns
//! `eyre::Result<T>` with context attached via `WrapErr`.
pub mod config;
pub mod metrics;
pub mod ports;
pub mod tracing_setup;
pub mod utils;

pub mod adapters;
pub mod core;

pub use crate::{
    adapters::{HttpClientAdapter, HttpHandler},
    core::{RelayError, RelayService},
    ports::http_client::UpstreamClient,
    utils::{GracefulShutdown, ShutdownReason},
};
