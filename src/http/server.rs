//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (CORS, body limit, request ID, tracing)
//! - Serve until the shutdown future resolves, then stop the pool

use std::future::Future;
use std::sync::Arc;
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::config::{DispatchStrategy, ProxyConfig};
use crate::http::{handlers, request};
use crate::security::{cors_layer, MethodFilter};
use crate::upstream::UpstreamPool;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<UpstreamPool>,
    pub filter: Arc<MethodFilter>,
    pub strategy: DispatchStrategy,
    pub windows: Arc<[usize]>,
}

/// HTTP front end for the upstream pool.
pub struct HttpServer {
    router: Router,
    pool: Arc<UpstreamPool>,
}

impl HttpServer {
    pub fn new(config: &ProxyConfig, pool: Arc<UpstreamPool>) -> Self {
        let state = AppState {
            pool: pool.clone(),
            filter: Arc::new(MethodFilter::from_allowed(config.filter.allowed_methods.iter().cloned())),
            strategy: config.dispatch.strategy,
            windows: config.reporting.windows.clone().into(),
        };

        let router = Self::build_router(config, state);
        Self { router, pool }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/", get(handlers::status).post(handlers::rpc))
            .route("/stats", get(handlers::stats))
            .route("/health", get(handlers::health))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_size))
            .layer(cors_layer(&config.cors.origins))
            .layer(request::propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(request::make_request_span))
            .layer(request::set_request_id_layer())
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` resolves. The pool's monitor and
    /// statistics loggers are stopped once the server has drained.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let result = axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await;

        self.pool.shutdown();
        tracing::info!("HTTP server stopped");
        result
    }
}
