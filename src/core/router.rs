//! Prefix matching for inbound request paths.

/// Path prefix every forwarded request receives on the origin.
pub const UPSTREAM_API_PREFIX: &str = "/api/";

/// The portion of an inbound path following the configured prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPath {
    segments: Vec<String>,
}

impl CapturedPath {
    /// Build from explicit segments. Empty segments are discarded.
    pub fn from_segments<I, S>(segments: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments
            .into_iter()
            .map(Into::into)
            .filter(|segment| !segment.is_empty())
            .collect();

        if segments.is_empty() {
            None
        } else {
            Some(Self { segments })
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// `s1/s2/...`
    pub fn joined(&self) -> String {
        self.segments.join("/")
    }

    /// `/api/s1/s2/...`, the path requested from the origin.
    pub fn upstream_path(&self) -> String {
        format!("{UPSTREAM_API_PREFIX}{}", self.joined())
    }
}

/// Matches paths under a static prefix, regardless of method.
#[derive(Debug, Clone)]
pub struct PathRouter {
    prefix: String,
}

impl PathRouter {
    /// `prefix` is normalised to have no trailing slash; "/" matches everything.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let prefix = prefix.trim_end_matches('/').to_string();
        Self { prefix }
    }

    pub fn prefix(&self) -> &str {
        if self.prefix.is_empty() {
            "/"
        } else {
            &self.prefix
        }
    }

    /// Route pattern for axum, e.g. `/api/{*path}`.
    pub fn route_pattern(&self) -> String {
        format!("{}/{{*path}}", self.prefix)
    }

    /// Capture the segments after the prefix. Operates on the raw (still
    /// percent-encoded) path so segments round-trip unchanged.
    ///
    /// Returns `None` when the path is outside the prefix or nothing follows it.
    pub fn capture(&self, path: &str) -> Option<CapturedPath> {
        let rest = path.strip_prefix(&self.prefix)?;
        let rest = rest.strip_prefix('/')?;
        CapturedPath::from_segments(rest.split('/'))
    }
}
