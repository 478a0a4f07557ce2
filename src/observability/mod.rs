//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatch, health monitor, HTTP layer produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows from the HTTP layer into the trace span
//! - Metrics are cheap when no exporter is installed

pub mod logging;
pub mod metrics;
