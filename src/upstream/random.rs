//! Uniform random dispatch strategy.

use std::sync::Arc;
use rand::Rng;
use crate::upstream::{LoadBalancer, UpstreamService};

#[derive(Debug, Default)]
pub struct Random;

impl Random {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for Random {
    fn next_server(&self, services: &[Arc<UpstreamService>]) -> Option<Arc<UpstreamService>> {
        if services.is_empty() {
            return None;
        }
        let index = rand::thread_rng().gen_range(0..services.len());
        services.get(index).cloned()
    }
}
