//! Health check capability.
//!
//! # Responsibilities
//! - Define the async probe consumed by the health monitor
//! - Provide the HTTP status-code probe used for real upstreams
//!
//! # Design Decisions
//! - The probe reports `Ok(false)` for an unhealthy upstream and `Err` only
//!   when the probe itself could not run; the monitor treats both as failure
//! - The nominal timeout is advisory: the monitor stops waiting on its own
//!   clock and never cancels an outstanding probe

use std::time::Duration;
use futures_util::future::{BoxFuture, FutureExt};
use thiserror::Error;

/// Error raised by a probe that could not be carried out.
#[derive(Debug, Error)]
#[error("health probe failed: {0}")]
pub struct HealthcheckError(pub String);

/// Async "is this upstream healthy?" predicate.
pub trait Healthcheck: Send + Sync {
    fn is_healthy(&self) -> BoxFuture<'_, Result<bool, HealthcheckError>>;

    /// Nominal time budget for one probe.
    fn timeout(&self) -> Duration;
}

/// Healthy iff a GET on the URL answers `200 OK`.
#[derive(Debug, Clone)]
pub struct HttpStatusHealthcheck {
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpStatusHealthcheck {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let url = url.into();
        let client = match reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("rpc-upstream-proxy-health-check")
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Failed to build health check client, probes run without a client timeout");
                reqwest::Client::new()
            }
        };

        Self {
            url,
            timeout,
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Healthcheck for HttpStatusHealthcheck {
    fn is_healthy(&self) -> BoxFuture<'_, Result<bool, HealthcheckError>> {
        async move {
            match self.client.get(&self.url).send().await {
                Ok(response) => {
                    let healthy = response.status() == reqwest::StatusCode::OK;
                    if !healthy {
                        tracing::debug!(url = %self.url, status = %response.status(), "Health probe returned non-200 status");
                    }
                    Ok(healthy)
                }
                Err(e) => {
                    tracing::debug!(url = %self.url, error = %e, "Health probe connection error");
                    Ok(false)
                }
            }
        }
        .boxed()
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
