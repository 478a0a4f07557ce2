//! A bounded time window of request/response/error events.

use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::time::Instant;

use crate::statistics::types::{Event, EventKind};

/// Groups the events that were opened within one rotation interval.
///
/// A slice is *balanced* once every operation requested in it has
/// received exactly one terminal event.
#[derive(Debug, Clone)]
pub struct TimeSlice {
    start: Instant,
    duration: Duration,
    events: Vec<Event>,
    pending_ids: HashSet<String>,
}

impl TimeSlice {
    pub fn new(start: Instant, duration: Duration) -> Self {
        Self {
            start,
            duration,
            events: Vec::new(),
            pending_ids: HashSet::new(),
        }
    }

    pub fn start(&self) -> Instant {
        self.start
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Number of operations still waiting for a terminal event.
    pub fn pending_count(&self) -> usize {
        self.pending_ids.len()
    }

    pub fn is_pending(&self, operation_id: &str) -> bool {
        self.pending_ids.contains(operation_id)
    }

    pub fn is_balanced(&self) -> bool {
        self.pending_ids.is_empty()
    }

    /// Open an operation. Returns false if the id is already open here.
    pub fn request(&mut self, operation_id: &str) -> bool {
        if !self.pending_ids.insert(operation_id.to_string()) {
            return false;
        }
        self.push(operation_id, EventKind::Request);
        true
    }

    /// Close an operation successfully. No-op returning false if not open here.
    pub fn response(&mut self, operation_id: &str) -> bool {
        self.close(operation_id, EventKind::Response)
    }

    /// Close an operation with an error. No-op returning false if not open here.
    pub fn error(&mut self, operation_id: &str) -> bool {
        self.close(operation_id, EventKind::Error)
    }

    fn close(&mut self, operation_id: &str, kind: EventKind) -> bool {
        if !self.pending_ids.remove(operation_id) {
            return false;
        }
        self.push(operation_id, kind);
        true
    }

    fn push(&mut self, operation_id: &str, kind: EventKind) {
        self.events.push(Event {
            operation_id: operation_id.to_string(),
            kind,
            occurred_at: Instant::now(),
        });
    }

    /// Mean latency in milliseconds over the operations that completed in
    /// this slice. Pairs the first request with the first terminal event per
    /// id; ids without a terminal event are ignored. Zero when nothing matched.
    pub fn avg_response_time_ms(&self) -> f64 {
        let mut pairs: HashMap<&str, (Instant, Option<Instant>)> = HashMap::new();

        for event in &self.events {
            let id = event.operation_id.as_str();
            if event.kind == EventKind::Request {
                pairs.entry(id).or_insert((event.occurred_at, None));
            } else if let Some((_, closed @ None)) = pairs.get_mut(id) {
                *closed = Some(event.occurred_at);
            }
        }

        let durations: Vec<f64> = pairs
            .values()
            .filter_map(|(requested, closed)| {
                closed.map(|c| c.duration_since(*requested).as_micros() as f64 / 1000.0)
            })
            .collect();

        if durations.is_empty() {
            return 0.0;
        }
        durations.iter().sum::<f64>() / durations.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice() -> TimeSlice {
        TimeSlice::new(Instant::now(), Duration::from_secs(1))
    }

    #[test]
    fn test_balanced_after_all_closed() {
        let mut s = slice();
        assert!(s.is_balanced());

        assert!(s.request("1"));
        assert!(s.request("2"));
        assert!(!s.is_balanced());

        assert!(s.response("1"));
        assert!(!s.is_balanced());
        assert!(s.error("2"));
        assert!(s.is_balanced());
        assert_eq!(s.events().len(), 4);
    }

    #[test]
    fn test_close_unknown_is_noop() {
        let mut s = slice();
        assert!(!s.response("missing"));
        assert!(!s.error("missing"));
        assert!(s.events().is_empty());
    }

    #[test]
    fn test_close_at_most_once() {
        let mut s = slice();
        s.request("1");
        assert!(s.response("1"));
        assert!(!s.error("1"));
        assert!(!s.response("1"));
        assert_eq!(
            s.events().iter().filter(|e| e.kind.is_terminal()).count(),
            1
        );
    }

    #[test]
    fn test_duplicate_request_rejected() {
        let mut s = slice();
        assert!(s.request("1"));
        assert!(!s.request("1"));
        assert_eq!(s.pending_count(), 1);
        assert_eq!(s.events().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_avg_response_time() {
        let mut s = slice();
        s.request("a");
        s.request("b");
        s.request("never");
        tokio::time::advance(Duration::from_millis(100)).await;
        s.response("a");
        tokio::time::advance(Duration::from_millis(200)).await;
        s.error("b");

        // a = 100ms, b = 300ms, "never" excluded
        assert_eq!(s.avg_response_time_ms(), 200.0);
    }

    #[test]
    fn test_avg_of_empty_slice_is_zero() {
        let mut s = slice();
        assert_eq!(s.avg_response_time_ms(), 0.0);
        s.request("open");
        assert_eq!(s.avg_response_time_ms(), 0.0);
    }
}
