//! In-process [`SessionStore`] backed by hash maps.
//!
//! Expiry is lazy: an expired string is treated as absent the moment its
//! deadline passes and is physically removed on the next access or by
//! [`MemoryStore::purge_expired`]. Deadlines use `tokio::time::Instant`,
//! so tests can pause and advance the clock instead of sleeping.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{SessionStore, StoreError};

/// A string value and its optional deadline.
#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

#[derive(Debug, Default)]
struct Inner {
    strings: HashMap<String, Entry>,
    hashes: HashMap<String, HashMap<String, String>>,
}

impl Inner {
    /// Drops `key` if it has expired; returns the live entry otherwise.
    fn live_string(&mut self, key: &str) -> Option<&Entry> {
        let now = Instant::now();
        if self.strings.get(key).is_some_and(|e| e.is_expired(now)) {
            self.strings.remove(key);
            return None;
        }
        self.strings.get(key)
    }

    fn ensure_not_hash(&self, key: &str) -> Result<(), StoreError> {
        if self.hashes.contains_key(key) {
            return Err(StoreError::WrongType(key.to_string()));
        }
        Ok(())
    }

    fn ensure_not_string(&mut self, key: &str) -> Result<(), StoreError> {
        if self.live_string(key).is_some() {
            return Err(StoreError::WrongType(key.to_string()));
        }
        Ok(())
    }
}

/// An in-memory session store.
///
/// Cheap to share: wrap it in an `Arc` and hand clones to the server and
/// to whatever else needs to inspect state (tests, admin tooling).
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Physically removes every expired string. Returns how many were
    /// removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        let before = inner.strings.len();
        inner.strings.retain(|_, entry| !entry.is_expired(now));
        let purged = before - inner.strings.len();
        if purged > 0 {
            tracing::debug!(purged, "purged expired keys");
        }
        purged
    }

    /// Number of fields in the hash at `key` (0 if absent).
    pub async fn hlen(&self, key: &str) -> usize {
        self.inner
            .lock()
            .await
            .hashes
            .get(key)
            .map_or(0, HashMap::len)
    }
}

impl SessionStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.ensure_not_hash(key)?;
        Ok(inner.live_string(key).map(|e| e.value.clone()))
    }

    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        // Like Redis SET: overwrites whatever type lived at the key.
        inner.hashes.remove(key);
        inner.strings.insert(
            key.to_string(),
            Entry {
                value,
                // A deadline past the clock's range never arrives.
                expires_at: ttl.and_then(|ttl| Instant::now().checked_add(ttl)),
            },
        );
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.ensure_not_hash(key)?;
        if inner.live_string(key).is_none() {
            return Ok(None);
        }
        Ok(inner.strings.remove(key).map(|e| e.value))
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        let was_string = inner.live_string(key).is_some();
        inner.strings.remove(key);
        let was_hash = inner.hashes.remove(key).is_some();
        Ok(was_string || was_hash)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        Ok(inner.live_string(key).is_some() || inner.hashes.contains_key(key))
    }

    async fn hget(
        &self,
        key: &str,
        field: &str,
    ) -> Result<Option<String>, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.ensure_not_string(key)?;
        Ok(inner
            .hashes
            .get(key)
            .and_then(|hash| hash.get(field))
            .cloned())
    }

    async fn hset(
        &self,
        key: &str,
        field: &str,
        value: String,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.ensure_not_string(key)?;
        inner
            .hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value);
        Ok(())
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.ensure_not_string(key)?;
        let Some(hash) = inner.hashes.get_mut(key) else {
            return Ok(false);
        };
        let removed = hash.remove(field).is_some();
        // An empty hash is the same as no hash.
        if hash.is_empty() {
            inner.hashes.remove(key);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for `MemoryStore`.
    //!
    //! TTL tests run with a paused Tokio clock (`start_paused = true`) and
    //! move time forward with `tokio::time::advance`, so they are instant
    //! and deterministic.

    use super::*;

    const TTL: Duration = Duration::from_secs(300);

    #[tokio::test]
    async fn test_get_missing_key_returns_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_then_get_returns_value() {
        let store = MemoryStore::new();
        store.set("k", "v".into(), None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        assert!(store.exists("k").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_with_ttl_expires_after_deadline() {
        let store = MemoryStore::new();
        store.set("k", "v".into(), Some(TTL)).await.unwrap();

        tokio::time::advance(TTL - Duration::from_secs(1)).await;
        assert!(store.exists("k").await.unwrap(), "still live before TTL");

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(!store.exists("k").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_again_resets_ttl() {
        let store = MemoryStore::new();
        store.set("k", "one".into(), Some(TTL)).await.unwrap();
        tokio::time::advance(Duration::from_secs(200)).await;
        store.set("k", "two".into(), Some(TTL)).await.unwrap();
        tokio::time::advance(Duration::from_secs(200)).await;

        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("two"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_with_unrepresentable_ttl_never_expires() {
        let store = MemoryStore::new();
        store
            .set("k", "v".into(), Some(Duration::from_secs(u64::MAX)))
            .await
            .unwrap();

        tokio::time::advance(TTL).await;
        assert_eq!(store.purge_expired().await, 0);
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_take_returns_value_once() {
        let store = MemoryStore::new();
        store.set("k", "v".into(), Some(TTL)).await.unwrap();

        assert_eq!(store.take("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.take("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_take_expired_returns_none() {
        let store = MemoryStore::new();
        store.set("k", "v".into(), Some(TTL)).await.unwrap();
        tokio::time::advance(TTL).await;

        assert_eq!(store.take("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_hash_set_get_delete() {
        let store = MemoryStore::new();
        store.hset("h", "a", "1".into()).await.unwrap();
        store.hset("h", "b", "2".into()).await.unwrap();

        assert_eq!(store.hget("h", "a").await.unwrap().as_deref(), Some("1"));
        assert_eq!(store.hlen("h").await, 2);

        assert!(store.hdel("h", "a").await.unwrap());
        assert!(!store.hdel("h", "a").await.unwrap(), "second delete is a no-op");
        assert_eq!(store.hget("h", "a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_hdel_last_field_removes_hash() {
        let store = MemoryStore::new();
        store.hset("h", "a", "1".into()).await.unwrap();
        store.hdel("h", "a").await.unwrap();

        assert!(!store.exists("h").await.unwrap());
    }

    #[tokio::test]
    async fn test_hash_command_on_string_key_is_wrong_type() {
        let store = MemoryStore::new();
        store.set("k", "v".into(), None).await.unwrap();

        let result = store.hset("k", "f", "x".into()).await;
        assert!(matches!(result, Err(StoreError::WrongType(k)) if k == "k"));
    }

    #[tokio::test]
    async fn test_del_reports_existence() {
        let store = MemoryStore::new();
        store.set("s", "v".into(), None).await.unwrap();
        store.hset("h", "f", "v".into()).await.unwrap();

        assert!(store.del("s").await.unwrap());
        assert!(store.del("h").await.unwrap());
        assert!(!store.del("s").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_removes_only_dead_keys() {
        let store = MemoryStore::new();
        store.set("short", "v".into(), Some(Duration::from_secs(1))).await.unwrap();
        store.set("long", "v".into(), Some(TTL)).await.unwrap();
        store.set("forever", "v".into(), None).await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(store.purge_expired().await, 1);
        assert!(store.exists("long").await.unwrap());
        assert!(store.exists("forever").await.unwrap());
    }
}
