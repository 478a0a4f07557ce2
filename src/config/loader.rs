//! Configuration loading from disk and environment.

use std::path::Path;
use std::fs;
use crate::config::schema::{ProxyConfig, UpstreamConfig};
use crate::config::validation::{check_http_url, validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env(String),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env(msg) => write!(f, "Environment error: {}", msg),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration: TOML file (if any), then environment overrides,
/// then validation.
pub fn load_config(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_file(path)?,
        None => ProxyConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn read_file(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Apply `PORT`, `CORS_ORIGINS`, `UPSTREAM_SERVICE_ENDPOINTS` and
/// `UPSTREAM_HEALTH_ENDPOINTS`. Empty variables are treated as unset.
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(port) = var("PORT") {
        let port: u16 = port
            .trim()
            .parse()
            .map_err(|_| ConfigError::Env(format!("PORT '{}' is not a valid port", port)))?;
        config.listener.bind_address = format!("0.0.0.0:{}", port);
    }

    if let Some(origins) = var("CORS_ORIGINS") {
        config.cors.origins = parse_url_list("CORS_ORIGINS", &origins)?;
    }

    match (var("UPSTREAM_SERVICE_ENDPOINTS"), var("UPSTREAM_HEALTH_ENDPOINTS")) {
        (None, None) => {}
        (Some(services), Some(health)) => {
            let services = parse_url_list("UPSTREAM_SERVICE_ENDPOINTS", &services)?;
            let health = parse_url_list("UPSTREAM_HEALTH_ENDPOINTS", &health)?;
            if services.len() != health.len() {
                return Err(ConfigError::Env(
                    "The number of UPSTREAM_SERVICE_ENDPOINTS and UPSTREAM_HEALTH_ENDPOINTS must be equal".to_string(),
                ));
            }
            config.upstreams = services
                .into_iter()
                .zip(health)
                .map(|(url, health_url)| UpstreamConfig { url, health_url })
                .collect();
        }
        _ => {
            return Err(ConfigError::Env(
                "UPSTREAM_SERVICE_ENDPOINTS and UPSTREAM_HEALTH_ENDPOINTS must be set together".to_string(),
            ));
        }
    }

    Ok(())
}

/// Split a comma-separated URL list, reporting every invalid entry at once.
pub fn parse_url_list(variable: &str, raw: &str) -> Result<Vec<String>, ConfigError> {
    let mut urls = Vec::new();
    let mut errors = Vec::new();

    for part in raw.split(',').map(str::trim) {
        match check_http_url(part) {
            Ok(_) => urls.push(part.to_string()),
            Err(e) => errors.push(e),
        }
    }

    if errors.is_empty() {
        Ok(urls)
    } else {
        Err(ConfigError::Env(format!(
            "Invalid URL(s) in the '{}' environment variable: {}",
            variable,
            errors.join(", ")
        )))
    }
}
