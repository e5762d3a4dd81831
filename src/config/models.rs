//! Configuration data structures for the relay.
//!
//! These types map directly to TOML (also JSON / YAML) configuration files and to
//! `RELAY__*` environment overrides. Every section has defaults so the binary can
//! start with no file at all; the origin is then picked from the environment.
use serde::{Deserialize, Serialize};

/// Environment variable consulted first when no internal origin is configured.
pub const INTERNAL_ORIGIN_ENV: &str = "INTERNAL_API_URL";
/// Environment variables for the public default, in precedence order. The
/// second is the name used by existing frontend deployments.
pub const PUBLIC_ORIGIN_ENVS: [&str; 2] = ["PUBLIC_API_URL", "NEXT_PUBLIC_API_URL"];
/// Origin used when nothing else is configured.
pub const FALLBACK_ORIGIN: &str = "http://backend:8000";

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_route_prefix() -> String {
    "/api".to_string()
}

/// Top level relay configuration. Immutable once the server starts.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RelayConfig {
    /// Socket address the inbound server binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Inbound path prefix that is forwarded (e.g. "/api")
    #[serde(default = "default_route_prefix")]
    pub route_prefix: String,
    #[serde(default)]
    pub origin: OriginConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub forwarding: ForwardingConfig,
    #[serde(default)]
    pub health: HealthConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            route_prefix: default_route_prefix(),
            origin: OriginConfig::default(),
            upstream: UpstreamConfig::default(),
            forwarding: ForwardingConfig::default(),
            health: HealthConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Create a new relay configuration builder
    pub fn builder() -> RelayConfigBuilder {
        RelayConfigBuilder::default()
    }

    /// The origin base URL selected for the lifetime of the process.
    pub fn origin_url(&self) -> String {
        resolve_origin(
            self.origin.internal_url.as_deref(),
            self.origin.public_url.as_deref(),
        )
    }
}

/// Candidate origin URLs, in precedence order.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct OriginConfig {
    /// Internal-only override, e.g. a service name on a private network
    pub internal_url: Option<String>,
    /// Public-facing default
    pub public_url: Option<String>,
}

impl OriginConfig {
    /// Fill unset sources from `INTERNAL_API_URL` and
    /// `PUBLIC_API_URL` / `NEXT_PUBLIC_API_URL`.
    pub fn with_env_fallbacks(self) -> Self {
        self.with_fallbacks_from(|name| std::env::var(name).ok())
    }

    /// Same as [`Self::with_env_fallbacks`] with an explicit variable lookup.
    pub fn with_fallbacks_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if is_blank(self.internal_url.as_deref()) {
            self.internal_url = lookup(INTERNAL_ORIGIN_ENV);
        }
        if is_blank(self.public_url.as_deref()) {
            self.public_url = PUBLIC_ORIGIN_ENVS
                .iter()
                .filter_map(|name| lookup(name))
                .find(|value| !is_blank(Some(value.as_str())));
        }
        self
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

/// Pick the origin: internal override, else public default, else the fallback.
/// Empty values count as absent.
pub fn resolve_origin(internal: Option<&str>, public: Option<&str>) -> String {
    [internal, public]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|candidate| !candidate.is_empty())
        .unwrap_or(FALLBACK_ORIGIN)
        .to_string()
}

/// Outbound call tuning.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Per-call timeout. `None` relies on the transport's own behaviour.
    pub timeout_secs: Option<u64>,
}

/// Inbound body handling.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Forward bodies of unrecognised content types as raw bytes instead of
    /// decoding them as text.
    pub binary_passthrough: bool,
    /// Upper bound on buffered inbound bodies. `None` means unbounded.
    pub max_body_bytes: Option<usize>,
}

/// Local health endpoint served by the relay itself.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct HealthConfig {
    pub enabled: bool,
    /// Local path, must lie outside `route_prefix`
    pub path: String,
    /// Probe the origin when the health endpoint is hit
    pub probe_origin: bool,
    /// Origin path probed with HEAD
    pub upstream_path: String,
    pub timeout_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/health".to_string(),
            probe_origin: false,
            upstream_path: "/api/health".to_string(),
            timeout_secs: 5,
        }
    }
}

/// Builder for RelayConfig, mostly used by tests and embedders.
#[derive(Default)]
pub struct RelayConfigBuilder {
    listen_addr: Option<String>,
    route_prefix: Option<String>,
    origin: OriginConfig,
    upstream: UpstreamConfig,
    forwarding: ForwardingConfig,
    health: Option<HealthConfig>,
}

impl RelayConfigBuilder {
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = Some(addr.into());
        self
    }

    pub fn route_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.route_prefix = Some(prefix.into());
        self
    }

    pub fn internal_origin(mut self, url: impl Into<String>) -> Self {
        self.origin.internal_url = Some(url.into());
        self
    }

    pub fn public_origin(mut self, url: impl Into<String>) -> Self {
        self.origin.public_url = Some(url.into());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.upstream.timeout_secs = Some(secs);
        self
    }

    pub fn binary_passthrough(mut self, enabled: bool) -> Self {
        self.forwarding.binary_passthrough = enabled;
        self
    }

    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.forwarding.max_body_bytes = Some(limit);
        self
    }

    pub fn health(mut self, config: HealthConfig) -> Self {
        self.health = Some(config);
        self
    }

    pub fn build(self) -> RelayConfig {
        RelayConfig {
            listen_addr: self.listen_addr.unwrap_or_else(default_listen_addr),
            route_prefix: self.route_prefix.unwrap_or_else(default_route_prefix),
            origin: self.origin,
            upstream: self.upstream,
            forwarding: self.forwarding,
            health: self.health.unwrap_or_default(),
        }
    }
}
