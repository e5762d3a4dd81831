//! Lightweight metrics helpers for the relay.
//!
//! Thin wrappers over the `metrics` crate macros. No exporter is embedded; the
//! application installs whatever recorder it wants and these calls feed it.
//!
//! Provided metrics:
//! * `relay_requests_total` (counter, labels: method, status)
//! * `relay_request_duration_seconds` (histogram, label: method)
//! * `relay_upstream_failures_total` (counter, label: kind)
use std::time::Instant;

use metrics::{Unit, counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::Lazy;

pub const RELAY_REQUESTS_TOTAL: &str = "relay_requests_total";
pub const RELAY_REQUEST_DURATION_SECONDS: &str = "relay_request_duration_seconds";
pub const RELAY_UPSTREAM_FAILURES_TOTAL: &str = "relay_upstream_failures_total";

static DESCRIPTIONS: Lazy<()> = Lazy::new(|| {
    describe_counter!(
        RELAY_REQUESTS_TOTAL,
        Unit::Count,
        "Total number of requests relayed to the origin, by final status."
    );
    describe_histogram!(
        RELAY_REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "Latency of relayed requests including the origin round trip."
    );
    describe_counter!(
        RELAY_UPSTREAM_FAILURES_TOTAL,
        Unit::Count,
        "Requests answered with 502 because the origin call did not complete."
    );
});

/// Increment the relayed request counter.
pub fn increment_request_total(method: &str, status: u16) {
    counter!(
        RELAY_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a relayed request's duration.
pub fn record_request_duration(method: &str, duration: std::time::Duration) {
    histogram!(RELAY_REQUEST_DURATION_SECONDS, "method" => method.to_string())
        .record(duration.as_secs_f64());
}

pub fn increment_upstream_failure(kind: &'static str) {
    counter!(RELAY_UPSTREAM_FAILURES_TOTAL, "kind" => kind).increment(1);
}

/// RAII helper measuring relayed request duration.
pub struct RequestTimer {
    start: Instant,
    method: String,
}

impl RequestTimer {
    pub fn new(method: &str) -> Self {
        Self {
            start: Instant::now(),
            method: method.to_string(),
        }
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        record_request_duration(&self.method, self.start.elapsed());
    }
}

/// Register metric descriptions (idempotent).
pub fn init_metrics() -> eyre::Result<()> {
    Lazy::force(&DESCRIPTIONS);
    tracing::info!("Relay metrics descriptions registered");
    Ok(())
}
