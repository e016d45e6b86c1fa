//! Per-owner write serialization.
//!
//! Reconciliation reads existing memories, asks the model, then writes. Two
//! interleaved runs for the same owner could lose updates or double-add, so
//! each run holds its owner's lock for the whole cycle. Different owners
//! never contend.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Clone, Default)]
pub struct OwnerLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl OwnerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and take the lock for `user_id`.
    pub async fn acquire(&self, user_id: &str) -> OwnedMutexGuard<()> {
        // Clone the Arc out so no DashMap shard guard is held across the await.
        let lock = self
            .locks
            .entry(user_id.to_string())
            .or_default()
            .value()
            .clone();
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn owners(&self) -> usize {
        self.locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_owner_is_serialized() {
        let locks = OwnerLocks::new();
        let guard = locks.acquire("alice").await;

        let contender = locks.clone();
        let waiter = tokio::spawn(async move {
            let _guard = contender.acquire("alice").await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_owners_do_not_contend() {
        let locks = OwnerLocks::new();
        let _alice = locks.acquire("alice").await;
        let bob = tokio::time::timeout(Duration::from_millis(100), locks.acquire("bob")).await;
        assert!(bob.is_ok());
        assert_eq!(locks.owners(), 2);
    }
}
