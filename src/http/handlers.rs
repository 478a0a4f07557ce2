//! Route handlers.

use std::collections::BTreeMap;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::health::HealthStatus;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::upstream::{pool::UpstreamSnapshot, RpcCall, UpstreamService};

const NOT_ENOUGH_DATA: &str = "Not enough data to compute statistics";

/// `POST /`: filter, then dispatch with the configured strategy.
pub async fn rpc(
    State(state): State<AppState>,
    payload: Result<Json<RpcCall>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(call) = payload?;

    if !state.filter.can_pass(&call) {
        metrics::record_rejected("method_not_allowed");
        tracing::info!(call_id = %call.id, method = %call.method, "Rejected call for method not on allow-list");
        return Err(ApiError::MethodNotAllowed);
    }

    let reply = state.pool.dispatch(state.strategy, &call).await?;
    Ok(Json(reply))
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub service: &'static str,
    pub version: &'static str,
    pub pool_size: usize,
    pub status: HealthStatus,
    pub upstreams: Vec<UpstreamReport>,
}

#[derive(Debug, Serialize)]
pub struct UpstreamReport {
    pub url: String,
    pub history_len: usize,
    /// Average response time in ms keyed `avg{window}`; only windows the
    /// history can satisfy appear.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub averages: Option<BTreeMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'static str>,
}

fn upstream_report(service: &UpstreamService, windows: &[usize]) -> UpstreamReport {
    let averages: BTreeMap<String, f64> = service
        .queries()
        .avg_response_times(windows)
        .into_iter()
        .map(|(window, avg)| (format!("avg{}", window), avg))
        .collect();

    let (averages, note) = if averages.is_empty() {
        (None, Some(NOT_ENOUGH_DATA))
    } else {
        (Some(averages), None)
    };

    UpstreamReport {
        url: service.url().to_string(),
        history_len: service.statistics().history_len(),
        averages,
        note,
    }
}

/// `GET /`: pool status and windowed latency per upstream.
pub async fn status(State(state): State<AppState>) -> Json<StatusReport> {
    let services = state.pool.services();
    let upstreams = services
        .iter()
        .map(|service| upstream_report(service, &state.windows))
        .collect();

    Json(StatusReport {
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        pool_size: services.len(),
        status: state.pool.status(),
        upstreams,
    })
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub status: HealthStatus,
    pub running: bool,
    pub upstreams: Vec<UpstreamSnapshot>,
}

/// `GET /stats`: raw per-upstream health and load snapshot.
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        status: state.pool.status(),
        running: state.pool.is_running(),
        upstreams: state.pool.snapshot(),
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub healthy: usize,
    pub total: usize,
}

/// `GET /health`: 200 unless the pool is down.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let healthy = state.pool.monitor().healthy_services().len();
    let total = state.pool.services().len();
    let status = HealthStatus::from_counts(healthy, total);

    let code = match status {
        HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };
    (code, Json(HealthResponse { status, healthy, total }))
}
