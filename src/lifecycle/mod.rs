//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Start loggers → Register upstreams → Start monitor
//!
//! Shutdown (shutdown.rs):
//!     Broadcast stop to timer tasks (rotation, health ticks)
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Stop accepting → Stop pool → Exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listener
//! - In-flight forwarded calls and probes are never cancelled

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
pub use startup::{start_pool, StartupError};
