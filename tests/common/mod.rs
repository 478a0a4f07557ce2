//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use rpc_upstream_proxy::config::{ProxyConfig, UpstreamConfig};
use rpc_upstream_proxy::http::HttpServer;
use rpc_upstream_proxy::lifecycle::{start_pool, Shutdown};
use rpc_upstream_proxy::UpstreamPool;

/// Programmable upstream: `POST /rpc` echoes the call id and its name,
/// `GET /health` answers 200 or 503.
#[derive(Clone)]
pub struct MockUpstream {
    pub name: &'static str,
    pub addr: SocketAddr,
    pub calls: Arc<AtomicUsize>,
    pub healthy: Arc<AtomicBool>,
    pub failing: Arc<AtomicBool>,
}

impl MockUpstream {
    pub fn rpc_url(&self) -> String {
        format!("http://{}/rpc", self.addr)
    }

    pub fn health_url(&self) -> String {
        format!("http://{}/health", self.addr)
    }

    pub fn config(&self) -> UpstreamConfig {
        UpstreamConfig {
            url: self.rpc_url(),
            health_url: self.health_url(),
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

async fn rpc(State(mock): State<MockUpstream>, Json(call): Json<Value>) -> impl IntoResponse {
    mock.calls.fetch_add(1, Ordering::SeqCst);
    if mock.failing.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "boom"})));
    }
    (StatusCode::OK, Json(json!({"id": call["id"], "result": mock.name})))
}

async fn health(State(mock): State<MockUpstream>) -> StatusCode {
    if mock.healthy.load(Ordering::SeqCst) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Start a mock upstream on an ephemeral port.
pub async fn start_mock_upstream(name: &'static str) -> MockUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mock = MockUpstream {
        name,
        addr: listener.local_addr().unwrap(),
        calls: Arc::new(AtomicUsize::new(0)),
        healthy: Arc::new(AtomicBool::new(true)),
        failing: Arc::new(AtomicBool::new(false)),
    };

    let app = Router::new()
        .route("/rpc", post(rpc))
        .route("/health", get(health))
        .with_state(mock.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    mock
}

/// Fast timings so health transitions settle within a test.
pub fn test_config(upstreams: &[&MockUpstream]) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.upstreams = upstreams.iter().map(|u| u.config()).collect();
    config.health_check.interval_ms = 50;
    config.health_check.timeout_ms = 500;
    config.statistics.interval_ms = 100;
    config.statistics.history_size = 20;
    config
}

pub struct RunningProxy {
    pub base_url: String,
    pub pool: Arc<UpstreamPool>,
    pub shutdown: Shutdown,
}

/// Start the pool and HTTP server for `config`.
pub async fn start_proxy(config: ProxyConfig) -> RunningProxy {
    let pool = start_pool(&config).unwrap();
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let mut stop = shutdown.subscribe();
    let server = HttpServer::new(&config, pool.clone());
    tokio::spawn(async move {
        let _ = server
            .run(listener, async move {
                let _ = stop.recv().await;
            })
            .await;
    });

    RunningProxy {
        base_url: format!("http://{}", addr),
        pool,
        shutdown,
    }
}

/// Poll `condition` every 20ms until it holds or `timeout` elapses.
pub async fn wait_for<F>(timeout: Duration, condition: F) -> bool
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

pub fn rpc_call(id: impl std::fmt::Display, method: &str) -> Value {
    json!({"id": id.to_string(), "method": method, "params": {"from": "0xabc", "to": "0xdef"}})
}
