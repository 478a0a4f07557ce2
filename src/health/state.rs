//! Upstream health state machine types.
//!
//! # States
//! - Unchecked: no probe has completed yet (not routable)
//! - Healthy: last probe succeeded, upstream receives traffic
//! - Unhealthy: last probe failed or timed out
//!
//! # State Transitions
//! ```text
//! Unchecked/Unhealthy → Healthy: probe returns true
//! Unchecked/Healthy → Unhealthy: probe returns false, errors, or exceeds timeout
//! ```
//!
//! A separate in-flight marker keeps at most one probe per upstream.

use std::fmt;
use std::sync::Arc;
use serde::Serialize;
use thiserror::Error;

use crate::upstream::UpstreamService;

/// Health of a single upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceHealth {
    #[default]
    Unchecked,
    Healthy,
    Unhealthy,
}

/// Aggregate pool classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Down,
}

impl HealthStatus {
    /// `Healthy` iff every upstream is healthy, `Down` iff none is
    /// (an empty pool is down), `Degraded` otherwise.
    pub fn from_counts(healthy: usize, total: usize) -> Self {
        if healthy == 0 {
            HealthStatus::Down
        } else if healthy == total {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Down => write!(f, "down"),
        }
    }
}

/// Delivered to subscribers on every health transition.
#[derive(Debug, Clone)]
pub struct StatusChange {
    /// URL of the upstream whose probe just settled.
    pub service: String,
    /// Its new health.
    pub service_health: ServiceHealth,
    /// Recomputed aggregate status.
    pub status: HealthStatus,
    /// Healthy upstreams, in registration order.
    pub healthy: Vec<Arc<UpstreamService>>,
}

/// Synchronous observer invoked in registration order.
pub type StatusChangedHandler = Arc<dyn Fn(&StatusChange) + Send + Sync>;

/// Errors raised by the health monitor lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    #[error("health monitor already running")]
    AlreadyRunning,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_counts() {
        assert_eq!(HealthStatus::from_counts(0, 0), HealthStatus::Down);
        assert_eq!(HealthStatus::from_counts(0, 3), HealthStatus::Down);
        assert_eq!(HealthStatus::from_counts(2, 3), HealthStatus::Degraded);
        assert_eq!(HealthStatus::from_counts(3, 3), HealthStatus::Healthy);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&HealthStatus::Degraded).unwrap(), "\"degraded\"");
        assert_eq!(HealthStatus::Down.to_string(), "down");
        assert_eq!(serde_json::to_string(&ServiceHealth::Unchecked).unwrap(), "\"unchecked\"");
    }
}
