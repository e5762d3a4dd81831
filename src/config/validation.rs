use std::net::SocketAddr;

use crate::config::models::{HealthConfig, RelayConfig};

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum ValidationError {
    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Invalid origin URL '{url}': {reason}")]
    InvalidOrigin { url: String, reason: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Relay configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the entire relay configuration, collecting every problem found.
    pub fn validate(config: &RelayConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_listen_address(&config.listen_addr) {
            errors.push(e);
        }

        if let Err(e) = Self::validate_route_prefix(&config.route_prefix) {
            errors.push(e);
        }

        if let Err(e) = Self::validate_origin(&config.origin_url()) {
            errors.push(e);
        }

        if config.upstream.timeout_secs == Some(0) {
            errors.push(ValidationError::InvalidField {
                field: "upstream.timeout_secs".to_string(),
                message: "Must be greater than 0 when set".to_string(),
            });
        }

        if config.forwarding.max_body_bytes == Some(0) {
            errors.push(ValidationError::InvalidField {
                field: "forwarding.max_body_bytes".to_string(),
                message: "Must be greater than 0 when set".to_string(),
            });
        }

        if let Err(mut health_errors) = Self::validate_health(&config.health, &config.route_prefix)
        {
            errors.append(&mut health_errors);
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            }),
        }
    }

    /// Validate listen address format
    fn validate_listen_address(address: &str) -> ValidationResult<()> {
        if address.parse::<SocketAddr>().is_err() {
            return Err(ValidationError::InvalidListenAddress {
                address: address.to_string(),
                reason: "Must be in format 'IP:PORT' (e.g., '127.0.0.1:3000' or '0.0.0.0:8080')"
                    .to_string(),
            });
        }
        Ok(())
    }

    /// The prefix is spliced into an axum route, so it must be a plain static path.
    fn validate_route_prefix(prefix: &str) -> ValidationResult<()> {
        let invalid = |message: &str| ValidationError::InvalidField {
            field: "route_prefix".to_string(),
            message: message.to_string(),
        };

        if !prefix.starts_with('/') {
            return Err(invalid("Route prefix must start with '/'"));
        }
        if prefix.len() > 1 && prefix.ends_with('/') {
            return Err(invalid("Route prefix must not end with '/'"));
        }
        if prefix.contains(['{', '}', '*', ':', '?', '#']) {
            return Err(invalid(
                "Route prefix must not contain wildcard or query characters",
            ));
        }
        if prefix.contains("//") {
            return Err(invalid("Route prefix must not contain empty segments"));
        }
        Ok(())
    }

    /// Validate origin URL format
    fn validate_origin(url_str: &str) -> ValidationResult<()> {
        let invalid = |reason: String| ValidationError::InvalidOrigin {
            url: url_str.to_string(),
            reason,
        };

        let url = url::Url::parse(url_str).map_err(|e| invalid(format!("{e}")))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(invalid(format!(
                "URL scheme must be 'http' or 'https', got '{}'",
                url.scheme()
            )));
        }
        if url.host().is_none() {
            return Err(invalid("URL must have a valid host".to_string()));
        }
        Ok(())
    }

    fn validate_health(
        config: &HealthConfig,
        route_prefix: &str,
    ) -> Result<(), Vec<ValidationError>> {
        if !config.enabled {
            return Ok(());
        }

        let mut errors = Vec::new();

        if !config.path.starts_with('/') {
            errors.push(ValidationError::InvalidField {
                field: "health.path".to_string(),
                message: "Health path must start with '/'".to_string(),
            });
        }

        let shadowed = config.path == route_prefix
            || config
                .path
                .strip_prefix(route_prefix)
                .is_some_and(|rest| rest.starts_with('/'));
        if shadowed && route_prefix != "/" {
            errors.push(ValidationError::InvalidField {
                field: "health.path".to_string(),
                message: format!("Health path must lie outside the route prefix '{route_prefix}'"),
            });
        }

        if config.probe_origin {
            if !config.upstream_path.starts_with('/') {
                errors.push(ValidationError::InvalidField {
                    field: "health.upstream_path".to_string(),
                    message: "Upstream health path must start with '/'".to_string(),
                });
            }
            if config.timeout_secs == 0 {
                errors.push(ValidationError::InvalidField {
                    field: "health.timeout_secs".to_string(),
                    message: "Must be greater than 0 when probing the origin".to_string(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        let mut message = format!("Found {} validation errors:\n", errors.len());
        for (i, error) in errors.iter().enumerate() {
            message.push_str(&format!("  {}. {}\n", i + 1, error));
        }
        message
    }
}
