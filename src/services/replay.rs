//! In-memory set of payment references that have already bought something.
//!
//! Lives as long as the server process; a restart forgets every entry.

use crate::services::chain::PaymentReference;
use dashmap::DashSet;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct ReplayGuard {
    consumed: Arc<DashSet<PaymentReference>>,
}

impl ReplayGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, reference: &PaymentReference) -> bool {
        self.consumed.contains(reference)
    }

    /// Insert `reference` if absent.
    ///
    /// Returns `false` when another caller consumed it first. The check and the
    /// insert happen under one shard lock, so two racing callers can never both
    /// see `true`.
    #[must_use]
    pub fn add(&self, reference: PaymentReference) -> bool {
        self.consumed.insert(reference)
    }

    pub fn len(&self) -> usize {
        self.consumed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::H256;

    fn reference(byte: u8) -> PaymentReference {
        PaymentReference::from(H256::repeat_byte(byte))
    }

    #[test]
    fn test_add_is_insert_if_absent() {
        let guard = ReplayGuard::new();
        assert!(guard.is_empty());

        assert!(guard.add(reference(1)));
        assert!(!guard.add(reference(1)));
        assert!(guard.add(reference(2)));

        assert!(guard.contains(&reference(1)));
        assert!(!guard.contains(&reference(3)));
        assert_eq!(guard.len(), 2);
    }

    #[test]
    fn test_clones_share_state() {
        let guard = ReplayGuard::new();
        let shared = guard.clone();

        assert!(shared.add(reference(7)));
        assert!(guard.contains(&reference(7)));
    }

    #[test]
    fn test_concurrent_adds_have_single_winner() {
        let guard = ReplayGuard::new();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let guard = guard.clone();
                std::thread::spawn(move || guard.add(reference(9)))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
    }
}
