//! Health-gated JSON-RPC routing proxy library.

// Core subsystems
pub mod statistics;
pub mod health;
pub mod upstream;

// Front end
pub mod config;
pub mod http;
pub mod security;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use upstream::{RpcCall, UpstreamPool, UpstreamService};
