//! Upstream management subsystem.
//!
//! # Data Flow
//! ```text
//! RpcCall (already passed the method filter)
//!     → pool.rs (running? status != down?)
//!     → health monitor's healthy list (live, registration order)
//!     → Apply dispatch strategy:
//!         - round_robin.rs (cursor mod healthy count)
//!         - random.rs (uniform pick)
//!     → service.rs (log request, forward, log response/error)
//!     → Return upstream JSON or DispatchError
//! ```
//!
//! # Design Decisions
//! - Strategies are stateless apart from their own cursor
//! - Only currently-healthy upstreams are eligible
//! - The healthy count is read at call time, so round-robin fairness can
//!   shift while the healthy set changes

pub mod pool;
pub mod random;
pub mod round_robin;
pub mod service;
pub mod types;

use std::sync::{Arc, RwLock, PoisonError};

pub use pool::UpstreamPool;
pub use service::{HttpTransport, RpcTransport, UpstreamService};
pub use types::{DispatchError, DispatchResult, RpcCall, UpstreamError};

/// Strategy for picking one upstream out of the healthy set.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    fn next_server(&self, services: &[Arc<UpstreamService>]) -> Option<Arc<UpstreamService>>;
}

/// Ordered, shared list of registered upstreams.
///
/// The pool appends to it; the health monitor reads it on every tick.
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    inner: Arc<RwLock<Vec<Arc<UpstreamService>>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_services(services: Vec<Arc<UpstreamService>>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(services)),
        }
    }

    pub fn register(&self, service: Arc<UpstreamService>) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(service);
    }

    /// Registered upstreams in registration order.
    pub fn snapshot(&self) -> Vec<Arc<UpstreamService>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
