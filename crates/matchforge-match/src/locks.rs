//! Per-match mutation locks.
//!
//! Every read-modify-write of a match record happens while holding that
//! match's lock, so two accepts racing for the last slot, or a leave
//! racing a start, are applied one after the other instead of the second
//! overwriting the first. Different matches never contend.

use std::collections::HashMap;
use std::sync::Arc;

use matchforge_protocol::MatchId;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub(crate) struct MatchLocks {
    locks: Mutex<HashMap<MatchId, Arc<Mutex<()>>>>,
}

impl MatchLocks {
    /// Waits for exclusive access to `match_id`.
    pub(crate) async fn acquire(&self, match_id: &MatchId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Entries nobody holds or waits on are only referenced by the
            // map itself.
            locks.retain(|id, lock| id == match_id || Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(match_id.clone()).or_default())
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_acquire_same_match_is_exclusive() {
        let locks = Arc::new(MatchLocks::default());
        let id = MatchId::new("m");

        let guard = locks.acquire(&id).await;
        let contender = {
            let locks = Arc::clone(&locks);
            let id = id.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&id).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished(), "second acquire must wait");

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_acquire_different_matches_do_not_block() {
        let locks = MatchLocks::default();
        let _a = locks.acquire(&MatchId::new("a")).await;
        let _b = locks.acquire(&MatchId::new("b")).await;
    }

    #[tokio::test]
    async fn test_released_locks_are_pruned() {
        let locks = MatchLocks::default();
        drop(locks.acquire(&MatchId::new("a")).await);
        drop(locks.acquire(&MatchId::new("b")).await);

        assert_eq!(locks.len().await, 1, "only the most recent entry remains");
    }
}
