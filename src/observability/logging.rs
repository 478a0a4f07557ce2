//! Structured logging.
//!
//! # Design Decisions
//! - `RUST_LOG` wins when set; otherwise the configured level applies to
//!   this crate and `tower_http`
//! - Human-readable fmt output on stdout

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. Safe to call once per process.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("rpc_upstream_proxy={level},tower_http={level}"))
    });

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    if let Err(e) = result {
        eprintln!("logging already initialised: {e}");
    }
}
