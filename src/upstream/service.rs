//! A single upstream compute service.
//!
//! # Responsibilities
//! - Bundle endpoint URL, health probe and statistics logger
//! - Forward one call and record exactly one terminal event for it
//!
//! # Design Decisions
//! - The forwarded call runs on its own task, so a caller that stops
//!   waiting does not cancel it and its terminal event is still recorded

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use futures_util::future::{BoxFuture, FutureExt};
use serde_json::Value;
use tokio::time::Instant;

use crate::health::check::Healthcheck;
use crate::observability::metrics;
use crate::statistics::{StatisticsLogger, StatisticsQueries};
use crate::upstream::types::{DispatchResult, RpcCall, UpstreamError};

/// Carries a call to an upstream and returns its decoded reply.
pub trait RpcTransport: Send + Sync {
    fn forward<'a>(&'a self, call: &'a RpcCall) -> BoxFuture<'a, Result<Value, UpstreamError>>;
}

/// JSON over HTTP POST.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(url, reqwest::Client::new())
    }

    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }
}

impl RpcTransport for HttpTransport {
    fn forward<'a>(&'a self, call: &'a RpcCall) -> BoxFuture<'a, Result<Value, UpstreamError>> {
        async move {
            let response = self.client.post(&self.url).json(call).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(UpstreamError::Status(status.as_u16()));
            }
            let body = response.bytes().await?;
            Ok(serde_json::from_slice(&body)?)
        }
        .boxed()
    }
}

/// An upstream endpoint with its health probe and statistics.
pub struct UpstreamService {
    url: String,
    healthcheck: Box<dyn Healthcheck>,
    statistics: Arc<StatisticsLogger>,
    transport: Arc<dyn RpcTransport>,
}

impl UpstreamService {
    /// Service forwarding over HTTP to `url`.
    pub fn new(
        url: impl Into<String>,
        healthcheck: impl Healthcheck + 'static,
        statistics: StatisticsLogger,
    ) -> Self {
        let url = url.into();
        let transport = HttpTransport::new(url.clone());
        Self::with_transport(url, healthcheck, statistics, transport)
    }

    pub fn with_transport(
        url: impl Into<String>,
        healthcheck: impl Healthcheck + 'static,
        statistics: StatisticsLogger,
        transport: impl RpcTransport + 'static,
    ) -> Self {
        Self {
            url: url.into(),
            healthcheck: Box::new(healthcheck),
            statistics: Arc::new(statistics),
            transport: Arc::new(transport),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn healthcheck(&self) -> &dyn Healthcheck {
        self.healthcheck.as_ref()
    }

    pub fn statistics(&self) -> &Arc<StatisticsLogger> {
        &self.statistics
    }

    pub fn queries(&self) -> StatisticsQueries {
        StatisticsQueries::new(Arc::clone(&self.statistics))
    }

    /// Forward `call`, logging its request before the network call and its
    /// response or error once it settles.
    ///
    /// Dropping the returned future does not cancel the forwarded call.
    pub async fn dispatch(&self, call: &RpcCall) -> DispatchResult<Value> {
        self.statistics.request(&call.id)?;
        tracing::debug!(url = %self.url, call_id = %call.id, method = %call.method, "Dispatching call");

        let forward = Forward {
            url: self.url.clone(),
            call: call.clone(),
            statistics: Arc::clone(&self.statistics),
            transport: Arc::clone(&self.transport),
        };
        tokio::spawn(forward.run()).await?
    }
}

/// One issued call, owned by the task that completes it.
struct Forward {
    url: String,
    call: RpcCall,
    statistics: Arc<StatisticsLogger>,
    transport: Arc<dyn RpcTransport>,
}

impl Forward {
    async fn run(self) -> DispatchResult<Value> {
        let started = Instant::now();
        match self.transport.forward(&self.call).await {
            Ok(value) => {
                self.statistics.response(&self.call.id)?;
                metrics::record_dispatch(&self.url, "success", elapsed(started));
                Ok(value)
            }
            Err(e) => {
                if let Err(stats) = self.statistics.error(&self.call.id) {
                    tracing::error!(url = %self.url, call_id = %self.call.id, error = %stats, "Failed to record call error");
                }
                metrics::record_dispatch(&self.url, "error", elapsed(started));
                tracing::warn!(url = %self.url, call_id = %self.call.id, error = %e, "Upstream call failed");
                Err(e.into())
            }
        }
    }
}

fn elapsed(started: Instant) -> Duration {
    Instant::now().saturating_duration_since(started)
}

impl fmt::Debug for UpstreamService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamService")
            .field("url", &self.url)
            .field("statistics", &self.statistics.snapshot())
            .finish_non_exhaustive()
    }
}
