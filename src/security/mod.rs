//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (origin check, preflight)
//!     → body limit (tower-http, configured in http/server.rs)
//!     → method_filter.rs (allow-list on the call's method)
//!     → Pass to upstream dispatch
//! ```
//!
//! # Design Decisions
//! - Fail closed: methods without an allow rule are rejected
//! - No trust in client input

pub mod cors;
pub mod method_filter;

pub use cors::cors_layer;
pub use method_filter::MethodFilter;
