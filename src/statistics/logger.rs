//! Time-sliced statistics logger.
//!
//! # Responsibilities
//! - Rotate the active time slice every `interval`
//! - Route new operations to the active slice
//! - Route completions to whichever pending slice opened them
//! - Keep a capped history of rotated slices for queries

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use serde::Serialize;
use tokio::time::{self, Instant};

use crate::lifecycle::Shutdown;
use crate::statistics::ring_buffer::RingBuffer;
use crate::statistics::time_slice::TimeSlice;
use crate::statistics::types::{StatisticsError, StatisticsResult};

type SliceId = u64;

/// Arena of slices shared by the active/pending/history views.
#[derive(Debug)]
struct LoggerState {
    interval: Duration,
    next_id: SliceId,
    active: Option<SliceId>,
    slices: HashMap<SliceId, TimeSlice>,
    pending: Vec<SliceId>,
    history: RingBuffer<SliceId>,
}

impl LoggerState {
    fn new(interval: Duration, history_size: usize) -> Self {
        Self {
            interval,
            next_id: 0,
            active: None,
            slices: HashMap::new(),
            pending: Vec::new(),
            history: RingBuffer::new(history_size),
        }
    }

    fn open_slice(&mut self, now: Instant) -> SliceId {
        let id = self.next_id;
        self.next_id += 1;
        self.slices.insert(id, TimeSlice::new(now, self.interval));
        self.active = Some(id);
        self.pending.push(id);
        id
    }

    fn rotate(&mut self, now: Instant) {
        if let Some(active) = self.active {
            self.history.push(active);
        }
        let active = self.open_slice(now);

        let slices = &self.slices;
        self.pending.retain(|id| {
            *id == active || slices.get(id).is_some_and(|s| !s.is_balanced())
        });

        let (pending, history) = (&self.pending, &self.history);
        self.slices
            .retain(|id, _| pending.contains(id) || history.contains(id));

        tracing::trace!(
            pending = self.pending.len(),
            history = self.history.len(),
            "Rotated statistics time slice"
        );
    }

    fn active_mut(&mut self) -> Option<&mut TimeSlice> {
        let id = self.active?;
        self.slices.get_mut(&id)
    }

    fn is_open(&self, operation_id: &str) -> bool {
        self.pending
            .iter()
            .filter_map(|id| self.slices.get(id))
            .any(|slice| slice.is_pending(operation_id))
    }

    fn close<F>(&mut self, operation_id: &str, mut close: F) -> StatisticsResult<()>
    where
        F: FnMut(&mut TimeSlice) -> bool,
    {
        for id in &self.pending {
            if let Some(slice) = self.slices.get_mut(id) {
                if close(slice) {
                    return Ok(());
                }
            }
        }
        Err(StatisticsError::UnknownOperation(operation_id.to_string()))
    }
}

/// Point-in-time counters for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatisticsSnapshot {
    pub running: bool,
    pub history_len: usize,
    pub history_capacity: usize,
    pub pending_slices: usize,
    pub in_flight: usize,
}

/// Records request/response/error events in rotating time slices.
///
/// The active slice receives every new `request`. When the interval elapses
/// it moves to history (balanced or not) and a fresh active slice takes
/// over; slices that still hold open operations stay pending so late
/// completions are counted where the operation started.
///
/// `start` must be called from within a Tokio runtime.
#[derive(Debug)]
pub struct StatisticsLogger {
    interval: Duration,
    state: Arc<Mutex<LoggerState>>,
    rotation: Mutex<Option<Shutdown>>,
}

impl StatisticsLogger {
    pub fn new(interval: Duration, history_size: usize) -> Self {
        Self {
            interval,
            state: Arc::new(Mutex::new(LoggerState::new(interval, history_size))),
            rotation: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Open the first active slice and spawn the rotation timer.
    pub fn start(&self) -> StatisticsResult<()> {
        let mut rotation = lock(&self.rotation);
        if rotation.is_some() {
            return Err(StatisticsError::AlreadyRunning);
        }

        let now = Instant::now();
        lock(&self.state).open_slice(now);

        let shutdown = Shutdown::new();
        let mut stop = shutdown.subscribe();
        let state = Arc::clone(&self.state);
        let period = self.interval;

        tokio::spawn(async move {
            let mut ticker = time::interval_at(now + period, period);
            loop {
                tokio::select! {
                    biased;
                    _ = stop.recv() => break,
                    _ = ticker.tick() => lock(&state).rotate(Instant::now()),
                }
            }
            tracing::debug!("Statistics rotation stopped");
        });

        *rotation = Some(shutdown);
        Ok(())
    }

    /// Halt rotation. Recorded slices are left untouched.
    pub fn stop(&self) {
        if let Some(shutdown) = lock(&self.rotation).take() {
            shutdown.trigger();
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.rotation).is_some()
    }

    /// Log the start of an operation in the active slice.
    ///
    /// An id still open in any pending slice is rejected.
    pub fn request(&self, operation_id: &str) -> StatisticsResult<()> {
        let mut state = lock(&self.state);
        if state.active.is_none() {
            return Err(StatisticsError::NotStarted);
        }
        if state.is_open(operation_id) {
            return Err(StatisticsError::DuplicateOperation(operation_id.to_string()));
        }
        let active = state.active_mut().ok_or(StatisticsError::NotStarted)?;
        if active.request(operation_id) {
            Ok(())
        } else {
            Err(StatisticsError::DuplicateOperation(operation_id.to_string()))
        }
    }

    /// Log the successful completion of an operation.
    pub fn response(&self, operation_id: &str) -> StatisticsResult<()> {
        lock(&self.state).close(operation_id, |slice| slice.response(operation_id))
    }

    /// Log the failed completion of an operation.
    pub fn error(&self, operation_id: &str) -> StatisticsResult<()> {
        lock(&self.state).close(operation_id, |slice| slice.error(operation_id))
    }

    /// Start of the active slice, if the logger has been started.
    pub fn current_window_start(&self) -> Option<Instant> {
        let state = lock(&self.state);
        state
            .active
            .and_then(|id| state.slices.get(&id))
            .map(TimeSlice::start)
    }

    pub fn history_len(&self) -> usize {
        lock(&self.state).history.len()
    }

    pub fn pending_len(&self) -> usize {
        lock(&self.state).pending.len()
    }

    /// Run `f` over the history, oldest slice first.
    pub fn with_history<R>(&self, f: impl FnOnce(&[&TimeSlice]) -> R) -> R {
        let state = lock(&self.state);
        let slices: Vec<&TimeSlice> = state
            .history
            .iter()
            .filter_map(|id| state.slices.get(id))
            .collect();
        f(&slices)
    }

    /// Run `f` over the pending slices, oldest first.
    pub fn with_pending<R>(&self, f: impl FnOnce(&[&TimeSlice]) -> R) -> R {
        let state = lock(&self.state);
        let slices: Vec<&TimeSlice> = state
            .pending
            .iter()
            .filter_map(|id| state.slices.get(id))
            .collect();
        f(&slices)
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        let running = self.is_running();
        let state = lock(&self.state);
        let in_flight = state
            .pending
            .iter()
            .filter_map(|id| state.slices.get(id))
            .map(TimeSlice::pending_count)
            .sum();
        StatisticsSnapshot {
            running,
            history_len: state.history.len(),
            history_capacity: state.history.capacity(),
            pending_slices: state.pending.len(),
            in_flight,
        }
    }
}

impl Drop for StatisticsLogger {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::statistics::types::EventKind;

    /// Advance the paused clock and let timer-driven tasks run.
    pub(crate) async fn advance(ms: u64) {
        time::advance(Duration::from_millis(ms)).await;
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rotates_at_interval() {
        let logger = StatisticsLogger::new(Duration::from_millis(1000), 3);
        logger.start().unwrap();

        let first = logger.current_window_start();
        advance(1000).await;
        let second = logger.current_window_start();

        assert!(first.is_some());
        assert_ne!(first, second);
        assert_eq!(logger.history_len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_rotation() {
        let logger = StatisticsLogger::new(Duration::from_millis(1000), 3);
        logger.start().unwrap();
        advance(1000).await;

        let first = logger.current_window_start();
        logger.stop();
        advance(1000).await;

        assert_eq!(first, logger.current_window_start());
        assert!(!logger.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_fails() {
        let logger = StatisticsLogger::new(Duration::from_millis(1000), 3);
        logger.start().unwrap();
        assert_eq!(logger.start(), Err(StatisticsError::AlreadyRunning));

        logger.stop();
        assert!(logger.start().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_keeps_most_recent_slices() {
        let logger = StatisticsLogger::new(Duration::from_millis(1000), 3);
        logger.start().unwrap();
        let origin = logger.current_window_start().unwrap();

        for _ in 0..5 {
            advance(1000).await;
        }

        assert_eq!(logger.history_len(), 3);
        let offsets: Vec<u128> = logger.with_history(|slices| {
            slices
                .iter()
                .map(|s| s.start().duration_since(origin).as_millis())
                .collect()
        });
        assert_eq!(offsets, vec![2000, 3000, 4000]);
    }

    #[tokio::test]
    async fn test_request_requires_start() {
        let logger = StatisticsLogger::new(Duration::from_millis(1000), 3);
        assert_eq!(logger.request("1"), Err(StatisticsError::NotStarted));
    }

    #[tokio::test(start_paused = true)]
    async fn test_logs_events_across_rotations() {
        let logger = StatisticsLogger::new(Duration::from_millis(1000), 3);
        logger.start().unwrap();

        for i in 0..30 {
            let id = i.to_string();
            logger.request(&id).unwrap();
            advance(100).await;
            if i % 2 == 0 {
                logger.response(&id).unwrap();
            } else {
                logger.error(&id).unwrap();
            }
        }
        logger.stop();

        logger.with_history(|slices| {
            assert_eq!(slices.len(), 3);
            for slice in slices {
                assert!(slice.is_balanced());
                let count = |kind| slice.events().iter().filter(|e| e.kind == kind).count();
                assert_eq!(count(EventKind::Request), 10);
                assert_eq!(count(EventKind::Response), 5);
                assert_eq!(count(EventKind::Error), 5);
            }
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_balanced_slices_left_pending() {
        let logger = StatisticsLogger::new(Duration::from_millis(1000), 3);
        logger.start().unwrap();

        for _ in 0..4 {
            advance(1000).await;
            logger.request("1").unwrap();
            logger.response("1").unwrap();
        }

        let active = logger.current_window_start();
        let balanced_pending = logger.with_pending(|slices| {
            slices
                .iter()
                .filter(|s| Some(s.start()) != active && s.is_balanced())
                .count()
        });
        assert_eq!(balanced_pending, 0);
        assert_eq!(logger.pending_len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbalanced_slice_stays_pending() {
        let logger = StatisticsLogger::new(Duration::from_millis(1000), 2);
        logger.start().unwrap();
        logger.request("slow").unwrap();

        for _ in 0..4 {
            advance(1000).await;
        }

        // Aged out of history but still pinned in pending.
        assert_eq!(logger.history_len(), 2);
        assert_eq!(logger.pending_len(), 2);
        assert_eq!(logger.snapshot().in_flight, 1);

        logger.response("slow").unwrap();
        advance(1000).await;
        assert_eq!(logger.pending_len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_after_rotation_hits_original_slice() {
        let logger = StatisticsLogger::new(Duration::from_millis(1000), 3);
        logger.start().unwrap();
        logger.request("late").unwrap();
        advance(1500).await;
        logger.response("late").unwrap();

        logger.with_history(|slices| {
            assert_eq!(slices.len(), 1);
            assert!(slices[0].is_balanced());
            assert_eq!(slices[0].avg_response_time_ms(), 1500.0);
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_id_rejected_after_rotation() {
        let logger = StatisticsLogger::new(Duration::from_millis(1000), 3);
        logger.start().unwrap();
        logger.request("x").unwrap();
        advance(1000).await;

        assert_eq!(
            logger.request("x"),
            Err(StatisticsError::DuplicateOperation("x".to_string()))
        );
        assert_eq!(logger.snapshot().in_flight, 1);

        // Once closed, the id may be reused.
        logger.response("x").unwrap();
        assert!(logger.request("x").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_operation_fails() {
        let logger = StatisticsLogger::new(Duration::from_millis(1000), 3);
        logger.start().unwrap();

        assert_eq!(
            logger.response("never-requested"),
            Err(StatisticsError::UnknownOperation("never-requested".into()))
        );

        logger.request("1").unwrap();
        logger.response("1").unwrap();
        assert!(matches!(
            logger.error("1"),
            Err(StatisticsError::UnknownOperation(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_in_flight_request_rejected() {
        let logger = StatisticsLogger::new(Duration::from_millis(1000), 3);
        logger.start().unwrap();

        logger.request("1").unwrap();
        assert_eq!(
            logger.request("1"),
            Err(StatisticsError::DuplicateOperation("1".into()))
        );

        logger.response("1").unwrap();
        assert!(logger.request("1").is_ok());
    }
}
