//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_dispatch_total` (counter): forwarded calls by upstream, outcome
//! - `proxy_dispatch_duration_seconds` (histogram): forwarded call latency
//! - `proxy_dispatch_rejected_total` (counter): calls refused before dispatch
//! - `proxy_upstream_health` (gauge): 1=healthy, 0=unhealthy
//! - `proxy_pool_healthy_upstreams` (gauge): size of the healthy set
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so tests need no setup
//! - The Prometheus exporter serves its own scrape listener

use std::net::SocketAddr;
use std::time::Duration;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// One forwarded call settled. `outcome` is `success` or `error`.
pub fn record_dispatch(upstream: &str, outcome: &'static str, elapsed: Duration) {
    counter!(
        "proxy_dispatch_total",
        "upstream" => upstream.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("proxy_dispatch_duration_seconds", "upstream" => upstream.to_string())
        .record(elapsed.as_secs_f64());
}

/// A call was refused before reaching any upstream.
pub fn record_rejected(reason: &'static str) {
    counter!("proxy_dispatch_rejected_total", "reason" => reason).increment(1);
}

pub fn record_upstream_health(upstream: &str, healthy: bool) {
    gauge!("proxy_upstream_health", "upstream" => upstream.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_healthy_upstreams(count: usize) {
    gauge!("proxy_pool_healthy_upstreams").set(count as f64);
}
