//! Allow-list of RPC methods.

use std::collections::HashMap;
use crate::upstream::RpcCall;

/// Decides which calls may be dispatched. Methods without a rule are denied.
#[derive(Debug, Clone, Default)]
pub struct MethodFilter {
    rules: HashMap<String, bool>,
}

impl MethodFilter {
    pub fn new(rules: HashMap<String, bool>) -> Self {
        Self { rules }
    }

    /// Filter allowing exactly the given methods.
    pub fn from_allowed<I, S>(methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(methods.into_iter().map(|m| (m.into(), true)).collect())
    }

    pub fn can_pass(&self, call: &RpcCall) -> bool {
        self.rules.get(&call.method).copied().unwrap_or(false)
    }

    /// Allowed method names, sorted.
    pub fn allowed(&self) -> Vec<&str> {
        let mut allowed: Vec<&str> = self
            .rules
            .iter()
            .filter(|(_, allow)| **allow)
            .map(|(method, _)| method.as_str())
            .collect();
        allowed.sort_unstable();
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list() {
        let filter = MethodFilter::from_allowed(["compute_transfer"]);
        assert!(filter.can_pass(&RpcCall::new("1", "compute_transfer")));
        assert!(!filter.can_pass(&RpcCall::new("2", "eth_call")));
    }

    #[test]
    fn test_explicit_deny_rule() {
        let filter = MethodFilter::new(HashMap::from([
            ("compute_transfer".to_string(), true),
            ("debug_dump".to_string(), false),
        ]));
        assert!(!filter.can_pass(&RpcCall::new("1", "debug_dump")));
        assert_eq!(filter.allowed(), vec!["compute_transfer"]);
    }

    #[test]
    fn test_empty_filter_denies_everything() {
        assert!(!MethodFilter::default().can_pass(&RpcCall::new("1", "compute_transfer")));
    }
}
