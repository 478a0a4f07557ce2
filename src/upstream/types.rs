//! RPC call shape and dispatch error definitions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::statistics::StatisticsError;

/// A routed JSON-RPC style call.
///
/// Only `id` and `method` are interpreted; every other field is carried
/// through untouched so the upstream receives the call verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcCall {
    pub id: String,
    pub method: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RpcCall {
    pub fn new(id: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            method: method.into(),
            extra: Map::new(),
        }
    }

    /// Attach an additional payload field.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Failure of a single forwarded call.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Connection or transport failure.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Upstream answered with a non-success status.
    #[error("upstream returned status {0}")]
    Status(u16),

    /// Upstream body was not valid JSON.
    #[error("invalid upstream response body: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors surfaced to callers of the dispatch operations.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The pool's health monitor is not running.
    #[error("Dispatcher is not running.")]
    NotRunning,

    /// Aggregate status is down.
    #[error("No healthy upstream services available.")]
    NoHealthyUpstream,

    /// The forwarded call failed; already recorded as an error event.
    #[error("upstream request failed: {0}")]
    Upstream(#[from] UpstreamError),

    /// Statistics bookkeeping rejected the call.
    #[error("statistics error: {0}")]
    Statistics(#[from] StatisticsError),

    /// The task carrying the forwarded call panicked or was aborted.
    #[error("dispatch task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl DispatchError {
    /// True when no call was attempted because the pool could not serve it.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DispatchError::NotRunning | DispatchError::NoHealthyUpstream)
    }
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_keeps_extra_fields() {
        let raw = json!({
            "id": "7",
            "method": "compute_transfer",
            "params": {"from": "0x1", "to": "0x2"},
            "jsonrpc": "2.0"
        });
        let call: RpcCall = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(call.id, "7");
        assert_eq!(call.method, "compute_transfer");
        assert_eq!(call.extra.len(), 2);

        assert_eq!(serde_json::to_value(&call).unwrap(), raw);
    }

    #[test]
    fn test_call_requires_id_and_method() {
        assert!(serde_json::from_value::<RpcCall>(json!({"id": "1"})).is_err());
        assert!(serde_json::from_value::<RpcCall>(json!({"method": "m"})).is_err());
    }

    #[test]
    fn test_dispatch_error_classes() {
        assert!(DispatchError::NotRunning.is_unavailable());
        assert!(DispatchError::NoHealthyUpstream.is_unavailable());
        assert!(!DispatchError::Upstream(UpstreamError::Status(500)).is_unavailable());
        assert_eq!(
            DispatchError::NoHealthyUpstream.to_string(),
            "No healthy upstream services available."
        );
    }
}
