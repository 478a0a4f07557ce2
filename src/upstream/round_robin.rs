//! Round-robin dispatch strategy.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use crate::upstream::{LoadBalancer, UpstreamService};

/// Round-robin selector over the healthy set.
///
/// The cursor only ever grows and is reduced modulo the healthy count at
/// call time, so the rotation shifts when that count changes between calls.
#[derive(Debug)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self {
            cursor: AtomicUsize::new(1),
        }
    }
}

impl Default for RoundRobin {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadBalancer for RoundRobin {
    fn next_server(&self, services: &[Arc<UpstreamService>]) -> Option<Arc<UpstreamService>> {
        if services.is_empty() {
            return None;
        }
        let cursor = self.cursor.fetch_add(1, Ordering::Relaxed);
        services.get(cursor % services.len()).cloned()
    }
}
