//! Startup orchestration.
//!
//! # Responsibilities
//! - Log a summary of the validated configuration
//! - Build one upstream service per configured endpoint
//! - Start every statistics logger, then the pool's health monitor
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Loggers start before the monitor so the first dispatch has a slice

use std::sync::Arc;
use thiserror::Error;

use crate::config::ProxyConfig;
use crate::health::{HttpStatusHealthcheck, MonitorError};
use crate::statistics::{StatisticsError, StatisticsLogger};
use crate::upstream::{UpstreamPool, UpstreamService};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to start statistics logger for {url}: {source}")]
    Statistics {
        url: String,
        #[source]
        source: StatisticsError,
    },

    #[error("failed to start health monitor: {0}")]
    Monitor(#[from] MonitorError),
}

pub fn log_config_summary(config: &ProxyConfig) {
    tracing::info!(
        bind_address = %config.listener.bind_address,
        strategy = ?config.dispatch.strategy,
        check_interval_ms = config.health_check.interval_ms,
        check_timeout_ms = config.health_check.timeout_ms,
        statistics_interval_ms = config.statistics.interval_ms,
        history_size = config.statistics.history_size,
        "Configuration loaded"
    );
    for origin in &config.cors.origins {
        tracing::info!(origin = %origin, "CORS origin");
    }
    for upstream in &config.upstreams {
        tracing::info!(url = %upstream.url, health_url = %upstream.health_url, "Upstream endpoint");
    }
}

/// Build, populate and start the upstream pool.
pub fn start_pool(config: &ProxyConfig) -> Result<Arc<UpstreamPool>, StartupError> {
    let pool = Arc::new(UpstreamPool::new(config.health_check.interval()));

    for upstream in &config.upstreams {
        let healthcheck = HttpStatusHealthcheck::new(&upstream.health_url, config.health_check.timeout());
        let statistics = StatisticsLogger::new(config.statistics.interval(), config.statistics.history_size);
        statistics.start().map_err(|source| StartupError::Statistics {
            url: upstream.url.clone(),
            source,
        })?;

        pool.register_upstream_service(Arc::new(UpstreamService::new(
            upstream.url.clone(),
            healthcheck,
            statistics,
        )));
    }

    pool.start()?;
    tracing::info!(upstreams = config.upstreams.len(), "Upstream pool started");
    Ok(pool)
}
