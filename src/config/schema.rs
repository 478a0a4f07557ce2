//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;
use serde::{Deserialize, Serialize};

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Upstream compute services, in dispatch order.
    pub upstreams: Vec<UpstreamConfig>,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Statistics rotation settings.
    pub statistics: StatisticsConfig,

    /// Dispatch strategy.
    pub dispatch: DispatchConfig,

    /// Method allow-list.
    pub filter: FilterConfig,

    pub cors: CorsConfig,

    /// Status report windows.
    pub reporting: ReportingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:4999").
    pub bind_address: String,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4999".to_string(),
            max_body_size: 1024 * 1024,
        }
    }
}

/// One upstream compute service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Endpoint receiving forwarded calls.
    pub url: String,

    /// Endpoint probed by the health monitor.
    pub health_url: String,
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Interval between check ticks.
    pub interval_ms: u64,

    /// Time after which an unanswered probe counts as failed.
    pub timeout_ms: u64,
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5000,
            timeout_ms: 1000,
        }
    }
}

/// Statistics time slicing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StatisticsConfig {
    /// Length of one time slice.
    pub interval_ms: u64,

    /// Number of rotated slices kept for queries.
    pub history_size: usize,
}

impl StatisticsConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            history_size: 120,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStrategy {
    #[default]
    RoundRobin,
    Random,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub strategy: DispatchStrategy,
}

/// Methods allowed through to the upstreams.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    pub allowed_methods: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            allowed_methods: vec!["compute_transfer".to_string()],
        }
    }
}

/// CORS allowed origins; empty disables cross-origin access.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    pub origins: Vec<String>,
}

/// Window sizes, in slices, reported by the status endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportingConfig {
    pub windows: Vec<usize>,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            windows: vec![30, 60, 120],
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable Prometheus metrics.
    pub metrics_enabled: bool,

    /// Metrics endpoint address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
