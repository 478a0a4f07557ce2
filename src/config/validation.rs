//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate upstream URLs and reject duplicates
//! - Validate value ranges (intervals > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem, tagged with the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check that `raw` is an absolute http(s) URL.
pub fn check_http_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| format!("invalid URL '{}': {}", raw, e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme '{}' in '{}'", other, raw)),
    }
}

pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_body_size == 0 {
        errors.push(ValidationError::new("listener.max_body_size", "must be greater than 0"));
    }

    if config.upstreams.is_empty() {
        errors.push(ValidationError::new("upstreams", "at least one upstream is required"));
    }
    let mut seen = HashSet::new();
    for (i, upstream) in config.upstreams.iter().enumerate() {
        if let Err(e) = check_http_url(&upstream.url) {
            errors.push(ValidationError::new(format!("upstreams[{}].url", i), e));
        }
        if let Err(e) = check_http_url(&upstream.health_url) {
            errors.push(ValidationError::new(format!("upstreams[{}].health_url", i), e));
        }
        if !seen.insert(upstream.url.as_str()) {
            errors.push(ValidationError::new(
                format!("upstreams[{}].url", i),
                format!("duplicate upstream '{}'", upstream.url),
            ));
        }
    }

    for (field, value) in [
        ("health_check.interval_ms", config.health_check.interval_ms),
        ("health_check.timeout_ms", config.health_check.timeout_ms),
        ("statistics.interval_ms", config.statistics.interval_ms),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        }
    }
    if config.statistics.history_size == 0 {
        errors.push(ValidationError::new("statistics.history_size", "must be greater than 0"));
    }

    for origin in &config.cors.origins {
        if let Err(e) = check_http_url(origin) {
            errors.push(ValidationError::new("cors.origins", e));
        }
    }

    if config.reporting.windows.iter().any(|w| *w == 0) {
        errors.push(ValidationError::new("reporting.windows", "window sizes must be greater than 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
