//! RPC upstream proxy.
//!
//! Routes JSON-RPC calls to a pool of upstream compute services, only to
//! those currently passing their health check, and keeps time-sliced
//! latency statistics per upstream.
//!
//! # Architecture Overview
//!
//! ```text
//!                              ┌──────────────────────────────────────────────┐
//!                              │                 RPC PROXY                     │
//!     Client POST /            │  ┌─────────┐   ┌──────────┐   ┌───────────┐  │
//!     ─────────────────────────┼─▶│  http   │──▶│  method  │──▶│ upstream  │──┼──▶ Upstream
//!                              │  │ server  │   │  filter  │   │   pool    │  │    Service
//!                              │  └─────────┘   └──────────┘   └─────┬─────┘  │
//!                              │                                     │        │
//!                              │          ┌──────────────┐     ┌─────▼─────┐  │
//!                              │          │    health    │────▶│  healthy  │  │
//!                              │          │   monitor    │     │    set    │  │
//!                              │          └──────────────┘     └───────────┘  │
//!                              │          ┌──────────────┐                    │
//!                              │          │  statistics  │ per upstream       │
//!                              │          │ time slices  │                    │
//!                              │          └──────────────┘                    │
//!                              └──────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use clap::Parser;
use tokio::net::TcpListener;

use rpc_upstream_proxy::config::load_config;
use rpc_upstream_proxy::http::HttpServer;
use rpc_upstream_proxy::lifecycle::{self, startup};
use rpc_upstream_proxy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "rpc-upstream-proxy", version, about = "Health-gated JSON-RPC routing proxy")]
struct Args {
    /// Path to a TOML config file. Environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "rpc-upstream-proxy starting");
    startup::log_config_summary(&config);

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let pool = lifecycle::start_pool(&config)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(&config, pool);
    server.run(listener, lifecycle::shutdown_signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
