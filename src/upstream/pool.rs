//! Upstream pool management.
//!
//! # Responsibilities
//! - Own the ordered upstream list and its health monitor
//! - Gate dispatch on the monitor running and the pool not being down
//! - Apply the dispatch strategy over the live healthy set

use std::sync::Arc;
use std::time::Duration;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::config::DispatchStrategy;
use crate::health::{HealthMonitor, HealthStatus, MonitorError, ServiceHealth, StatusChange, StatusChangedHandler};
use crate::observability::metrics;
use crate::statistics::StatisticsSnapshot;
use crate::upstream::{
    random::Random,
    round_robin::RoundRobin,
    LoadBalancer, RpcCall, ServiceRegistry, UpstreamService,
    types::{DispatchError, DispatchResult},
};

/// Point-in-time view of one upstream for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamSnapshot {
    pub url: String,
    pub health: ServiceHealth,
    pub checking: bool,
    pub statistics: StatisticsSnapshot,
}

/// Health-gated dispatcher over a set of upstreams.
#[derive(Debug)]
pub struct UpstreamPool {
    services: ServiceRegistry,
    monitor: HealthMonitor,
    round_robin: RoundRobin,
    random: Random,
}

impl UpstreamPool {
    pub fn new(check_interval: Duration) -> Self {
        let services = ServiceRegistry::new();
        Self {
            monitor: HealthMonitor::new(services.clone(), check_interval),
            services,
            round_robin: RoundRobin::new(),
            random: Random::new(),
        }
    }

    /// Append an upstream. Meant to be called before [`start`](Self::start).
    pub fn register_upstream_service(&self, service: Arc<UpstreamService>) {
        tracing::debug!(url = %service.url(), "Registered upstream service");
        self.services.register(service);
    }

    pub fn start(&self) -> Result<(), MonitorError> {
        self.monitor.start()
    }

    /// Stop health checking. Statistics loggers keep running.
    pub fn stop(&self) {
        self.monitor.stop();
    }

    /// Stop health checking and every upstream's statistics rotation.
    pub fn shutdown(&self) {
        self.monitor.stop();
        for service in self.services.snapshot() {
            service.statistics().stop();
        }
        tracing::info!(services = self.services.len(), "Upstream pool stopped");
    }

    pub fn is_running(&self) -> bool {
        self.monitor.is_running()
    }

    pub fn status(&self) -> HealthStatus {
        self.monitor.status()
    }

    /// Registered upstreams in registration order.
    pub fn services(&self) -> Vec<Arc<UpstreamService>> {
        self.services.snapshot()
    }

    pub fn monitor(&self) -> &HealthMonitor {
        &self.monitor
    }

    pub fn register_state_change_handler(&self, handler: StatusChangedHandler) {
        self.monitor.register_state_change_handler(handler);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.monitor.subscribe()
    }

    /// Forward to the next healthy upstream in rotation.
    pub async fn dispatch_round_robin(&self, call: &RpcCall) -> DispatchResult<Value> {
        let service = self.select(&self.round_robin)?;
        service.dispatch(call).await
    }

    /// Forward to a uniformly chosen healthy upstream.
    pub async fn dispatch_random(&self, call: &RpcCall) -> DispatchResult<Value> {
        let service = self.select(&self.random)?;
        service.dispatch(call).await
    }

    pub async fn dispatch(&self, strategy: DispatchStrategy, call: &RpcCall) -> DispatchResult<Value> {
        match strategy {
            DispatchStrategy::RoundRobin => self.dispatch_round_robin(call).await,
            DispatchStrategy::Random => self.dispatch_random(call).await,
        }
    }

    pub fn snapshot(&self) -> Vec<UpstreamSnapshot> {
        self.services
            .snapshot()
            .iter()
            .map(|service| UpstreamSnapshot {
                url: service.url().to_string(),
                health: self.monitor.service_health(service.url()),
                checking: self.monitor.is_checking(service.url()),
                statistics: service.statistics().snapshot(),
            })
            .collect()
    }

    fn select(&self, balancer: &dyn LoadBalancer) -> DispatchResult<Arc<UpstreamService>> {
        if !self.monitor.is_running() {
            metrics::record_rejected("not_running");
            return Err(DispatchError::NotRunning);
        }

        let healthy = self.monitor.healthy_services();
        match balancer.next_server(&healthy) {
            Some(service) => Ok(service),
            None => {
                metrics::record_rejected("no_healthy_upstream");
                tracing::warn!(registered = self.services.len(), "No healthy upstream services available");
                Err(DispatchError::NoHealthyUpstream)
            }
        }
    }
}
