//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Check timer (monitor.rs):
//!     Every check interval
//!     → Probe each upstream through its Healthcheck (check.rs)
//!     → Update state.rs
//!     → Notify handlers and channel subscribers
//!
//! State machine (state.rs):
//!     Unchecked → Healthy ←→ Unhealthy
//!     A single probe result flips the state
//! ```
//!
//! # Design Decisions
//! - Health state is per-upstream; pool status is derived from the counts
//! - Probe timeouts are measured by the monitor, not enforced on the probe

pub mod check;
pub mod monitor;
pub mod state;

pub use check::{Healthcheck, HealthcheckError, HttpStatusHealthcheck};
pub use monitor::HealthMonitor;
pub use state::{HealthStatus, MonitorError, ServiceHealth, StatusChange, StatusChangedHandler};
