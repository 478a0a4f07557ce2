//! Call statistics subsystem.
//!
//! # Data Flow
//! ```text
//! UpstreamService.dispatch
//!     → logger.rs request(id)        (active slice)
//!     → ... network call ...
//!     → logger.rs response/error(id) (any pending slice holding id)
//!
//! Rotation task (every interval):
//!     active → history (ring_buffer.rs, oldest evicted)
//!     new active → pending
//!     balanced non-active slices dropped from pending
//!
//! Reporting:
//!     queries.rs reads history → windowed average latency
//! ```
//!
//! # Design Decisions
//! - Slices live in an arena owned by the logger; history and pending hold ids
//! - A call closed after rotation is still attributed to the slice it opened in
//! - History is capped; pending is not (unbalanced slices stay until closed)

pub mod logger;
pub mod queries;
pub mod ring_buffer;
pub mod time_slice;
pub mod types;

pub use logger::{StatisticsLogger, StatisticsSnapshot};
pub use queries::StatisticsQueries;
pub use ring_buffer::RingBuffer;
pub use time_slice::TimeSlice;
pub use types::{Event, EventKind, StatisticsError, StatisticsResult};
