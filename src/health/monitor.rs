//! Periodic health monitor.
//!
//! # Responsibilities
//! - Probe every registered upstream once per check interval
//! - Keep at most one probe in flight per upstream
//! - Fail probes that outlive their timeout and ignore their late results
//! - Notify subscribers on every transition
//!
//! # Tick Algorithm
//! ```text
//! for each upstream (registration order):
//!     probe in flight, elapsed <  timeout → skip
//!     probe in flight, elapsed >= timeout → clear marker, mark unhealthy
//!     no probe in flight                  → set marker, spawn probe
//! probe settles:
//!     marker still its own → clear marker, mark healthy/unhealthy
//!     otherwise            → ignore (already decided by timeout)
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{self, Instant};

use crate::health::state::{HealthStatus, MonitorError, ServiceHealth, StatusChange, StatusChangedHandler};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::upstream::{ServiceRegistry, UpstreamService};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy)]
struct InFlightCheck {
    started_at: Instant,
    check_id: u64,
}

#[derive(Debug, Default)]
struct MonitorState {
    health: HashMap<String, ServiceHealth>,
    in_flight: HashMap<String, InFlightCheck>,
    next_check_id: u64,
}

struct MonitorInner {
    services: ServiceRegistry,
    check_interval: Duration,
    state: Mutex<MonitorState>,
    handlers: RwLock<Vec<StatusChangedHandler>>,
    events: broadcast::Sender<StatusChange>,
}

impl MonitorInner {
    fn tick(self: &Arc<Self>) {
        let now = Instant::now();

        for service in self.services.snapshot() {
            let url = service.url().to_string();
            let timeout = service.healthcheck().timeout();
            let mut state = lock(&self.state);

            if let Some(check) = state.in_flight.get(&url).copied() {
                let elapsed = now.saturating_duration_since(check.started_at);
                if elapsed < timeout {
                    tracing::debug!(url = %url, elapsed_ms = elapsed.as_millis() as u64, "Skipping health check, probe still in flight");
                    continue;
                }

                state.in_flight.remove(&url);
                drop(state);
                tracing::warn!(url = %url, elapsed_ms = elapsed.as_millis() as u64, "Health check timed out");
                self.transition(&url, ServiceHealth::Unhealthy);
                continue;
            }

            let check_id = state.next_check_id;
            state.next_check_id += 1;
            state.in_flight.insert(
                url.clone(),
                InFlightCheck {
                    started_at: now,
                    check_id,
                },
            );
            drop(state);

            let inner = Arc::clone(self);
            tokio::spawn(async move {
                let healthy = match service.healthcheck().is_healthy().await {
                    Ok(healthy) => healthy,
                    Err(e) => {
                        tracing::error!(url = %url, error = %e, "Health check failed");
                        false
                    }
                };
                inner.settle(&url, check_id, healthy);
            });
        }
    }

    fn settle(&self, url: &str, check_id: u64, healthy: bool) {
        {
            let mut state = lock(&self.state);
            match state.in_flight.get(url) {
                Some(check) if check.check_id == check_id => {
                    state.in_flight.remove(url);
                }
                _ => {
                    tracing::debug!(url = %url, "Ignoring health check result decided by timeout");
                    return;
                }
            }
        }

        let health = if healthy {
            ServiceHealth::Healthy
        } else {
            ServiceHealth::Unhealthy
        };
        self.transition(url, health);
    }

    fn transition(&self, url: &str, health: ServiceHealth) {
        lock(&self.state).health.insert(url.to_string(), health);

        let healthy = self.healthy_services();
        let status = HealthStatus::from_counts(healthy.len(), self.services.len());

        match health {
            ServiceHealth::Healthy => tracing::info!(url = %url, status = %status, "Upstream is healthy"),
            _ => tracing::warn!(url = %url, status = %status, "Upstream is unhealthy"),
        }
        metrics::record_upstream_health(url, health == ServiceHealth::Healthy);
        metrics::record_healthy_upstreams(healthy.len());

        let change = StatusChange {
            service: url.to_string(),
            service_health: health,
            status,
            healthy,
        };

        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for handler in &handlers {
            handler(&change);
        }

        // No receivers is fine.
        let _ = self.events.send(change);
    }

    fn healthy_services(&self) -> Vec<Arc<UpstreamService>> {
        let state = lock(&self.state);
        self.services
            .snapshot()
            .into_iter()
            .filter(|s| state.health.get(s.url()) == Some(&ServiceHealth::Healthy))
            .collect()
    }
}

/// Continuously classifies registered upstreams as healthy or unhealthy.
///
/// Unchecked upstreams count as not healthy. Probes are never cancelled;
/// one that outlives its healthcheck's timeout is failed on the next tick
/// and its eventual result is discarded.
pub struct HealthMonitor {
    inner: Arc<MonitorInner>,
    ticker: Mutex<Option<Shutdown>>,
}

impl HealthMonitor {
    pub fn new(services: ServiceRegistry, check_interval: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(MonitorInner {
                services,
                check_interval,
                state: Mutex::new(MonitorState::default()),
                handlers: RwLock::new(Vec::new()),
                events,
            }),
            ticker: Mutex::new(None),
        }
    }

    pub fn check_interval(&self) -> Duration {
        self.inner.check_interval
    }

    /// Spawn the check timer. The first tick fires one interval from now.
    pub fn start(&self) -> Result<(), MonitorError> {
        let mut ticker = lock(&self.ticker);
        if ticker.is_some() {
            return Err(MonitorError::AlreadyRunning);
        }

        let shutdown = Shutdown::new();
        let mut stop = shutdown.subscribe();
        let inner = Arc::clone(&self.inner);
        let period = inner.check_interval;
        let first = Instant::now() + period;

        tokio::spawn(async move {
            let mut interval = time::interval_at(first, period);
            loop {
                tokio::select! {
                    biased;
                    _ = stop.recv() => break,
                    _ = interval.tick() => inner.tick(),
                }
            }
            tracing::debug!("Health monitor stopped");
        });

        *ticker = Some(shutdown);
        tracing::info!(
            services = self.inner.services.len(),
            interval_ms = period.as_millis() as u64,
            "Health monitor started"
        );
        Ok(())
    }

    /// Cancel the timer. Outstanding probes still settle.
    pub fn stop(&self) {
        if let Some(shutdown) = lock(&self.ticker).take() {
            shutdown.trigger();
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.ticker).is_some()
    }

    pub fn status(&self) -> HealthStatus {
        HealthStatus::from_counts(self.healthy_services().len(), self.inner.services.len())
    }

    /// Healthy upstreams in registration order.
    pub fn healthy_services(&self) -> Vec<Arc<UpstreamService>> {
        self.inner.healthy_services()
    }

    pub fn service_health(&self, url: &str) -> ServiceHealth {
        lock(&self.inner.state)
            .health
            .get(url)
            .copied()
            .unwrap_or_default()
    }

    /// True while a probe for `url` is in flight.
    pub fn is_checking(&self, url: &str) -> bool {
        lock(&self.inner.state).in_flight.contains_key(url)
    }

    /// Add a synchronous observer; observers run in registration order.
    pub fn register_state_change_handler(&self, handler: StatusChangedHandler) {
        self.inner
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }

    /// Receive every transition over a channel.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.inner.events.subscribe()
    }
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("services", &self.inner.services.len())
            .field("check_interval", &self.inner.check_interval)
            .field("running", &self.is_running())
            .finish()
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
