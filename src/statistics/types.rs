//! Statistics event types and error definitions.

use thiserror::Error;
use tokio::time::Instant;

/// Kind of a logged event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Request,
    Response,
    Error,
}

impl EventKind {
    /// Response and error both close an operation.
    pub fn is_terminal(self) -> bool {
        matches!(self, EventKind::Response | EventKind::Error)
    }
}

/// A single entry of a slice's event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub operation_id: String,
    pub kind: EventKind,
    pub occurred_at: Instant,
}

/// Errors raised by the statistics logger and its queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatisticsError {
    /// `request` was called before `start`.
    #[error("statistics logger not started")]
    NotStarted,

    /// `start` was called on a running logger.
    #[error("statistics logger already running")]
    AlreadyRunning,

    /// The id is already open in the active slice.
    #[error("operation {0} is already in flight")]
    DuplicateOperation(String),

    /// No pending slice holds the id.
    #[error("no pending time slice found for operation {0}")]
    UnknownOperation(String),

    /// History query beyond the retained slices.
    #[error("time slice index {index} out of range (history holds {len})")]
    OutOfRange { index: usize, len: usize },
}

/// Result type for statistics operations.
pub type StatisticsResult<T> = Result<T, StatisticsError>;
