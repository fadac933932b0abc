//! Subject ↔ connection mappings kept in the shared store.
//!
//! Two hashes hold the association in both directions:
//!
//! ```text
//! user:sockets  user-id → conn-id   "where can I reach alice?"
//! socket:users  conn-id → user-id   "who is on this connection?"
//! ```
//!
//! A subject has at most one live mapping: the most recent
//! authentication wins. When an older connection for the same subject
//! closes later, [`SessionMappings::unbind`] leaves the newer mapping
//! alone.

use std::sync::Arc;

use matchforge_protocol::UserId;
use matchforge_store::{SessionStore, keys};
use matchforge_transport::ConnectionId;

use crate::SessionError;

/// Reads and writes session mappings in a [`SessionStore`].
pub struct SessionMappings<S> {
    store: Arc<S>,
}

impl<S> Clone for SessionMappings<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: SessionStore> SessionMappings<S> {
    /// Creates a mapping view over `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Maps `user` to `conn`, replacing any previous connection.
    ///
    /// Returns the connection the user was mapped to before, if it was a
    /// different one. Its reverse entry is removed, so the stale
    /// connection no longer resolves to `user`.
    pub async fn bind(
        &self,
        user: &UserId,
        conn: &ConnectionId,
    ) -> Result<Option<ConnectionId>, SessionError> {
        let previous = self.connection_of(user).await?;
        let replaced = previous.filter(|old| old != conn);
        if let Some(old) = &replaced {
            self.store.hdel(keys::SOCKET_USERS, old.as_str()).await?;
            tracing::info!(%user, %old, new = %conn, "session moved to new connection");
        }

        self.store
            .hset(keys::USER_SOCKETS, user.as_str(), conn.as_str().to_string())
            .await?;
        self.store
            .hset(keys::SOCKET_USERS, conn.as_str(), user.as_str().to_string())
            .await?;
        Ok(replaced)
    }

    /// Removes the mapping between `user` and `conn`.
    ///
    /// The reverse entry for `conn` is always removed. The forward entry
    /// is removed only if it still points at `conn`; returns `true` in
    /// that case, `false` if a newer connection has taken over.
    pub async fn unbind(
        &self,
        user: &UserId,
        conn: &ConnectionId,
    ) -> Result<bool, SessionError> {
        self.store.hdel(keys::SOCKET_USERS, conn.as_str()).await?;

        let current = self.connection_of(user).await?;
        if current.as_ref() != Some(conn) {
            tracing::debug!(%user, %conn, "stale connection closed, mapping kept");
            return Ok(false);
        }
        self.store.hdel(keys::USER_SOCKETS, user.as_str()).await?;
        Ok(true)
    }

    /// The connection `user` is currently mapped to.
    pub async fn connection_of(
        &self,
        user: &UserId,
    ) -> Result<Option<ConnectionId>, SessionError> {
        let conn = self.store.hget(keys::USER_SOCKETS, user.as_str()).await?;
        Ok(conn.map(ConnectionId::new))
    }
}

#[cfg(test)]
mod tests {
    use matchforge_store::MemoryStore;

    use super::*;

    fn mappings() -> SessionMappings<MemoryStore> {
        SessionMappings::new(Arc::new(MemoryStore::new()))
    }

    /// Reads the reverse mapping straight from the store.
    async fn user_on(m: &SessionMappings<MemoryStore>, conn: &ConnectionId) -> Option<UserId> {
        m.store
            .hget(keys::SOCKET_USERS, conn.as_str())
            .await
            .unwrap()
            .map(UserId::new)
    }

    #[tokio::test]
    async fn test_bind_records_both_directions() {
        let m = mappings();
        let alice = UserId::new("alice");
        let conn = ConnectionId::new("127.0.0.1:1");

        assert_eq!(m.bind(&alice, &conn).await.unwrap(), None);
        assert_eq!(m.connection_of(&alice).await.unwrap(), Some(conn.clone()));
        assert_eq!(user_on(&m, &conn).await, Some(alice));
    }

    #[tokio::test]
    async fn test_bind_twice_last_connection_wins() {
        let m = mappings();
        let alice = UserId::new("alice");
        let old = ConnectionId::new("127.0.0.1:1");
        let new = ConnectionId::new("127.0.0.1:2");

        m.bind(&alice, &old).await.unwrap();
        let replaced = m.bind(&alice, &new).await.unwrap();

        assert_eq!(replaced, Some(old.clone()));
        assert_eq!(m.connection_of(&alice).await.unwrap(), Some(new));
        assert_eq!(user_on(&m, &old).await, None);
    }

    #[tokio::test]
    async fn test_bind_same_connection_reports_no_replacement() {
        let m = mappings();
        let alice = UserId::new("alice");
        let conn = ConnectionId::new("127.0.0.1:1");

        m.bind(&alice, &conn).await.unwrap();
        assert_eq!(m.bind(&alice, &conn).await.unwrap(), None);
        assert_eq!(user_on(&m, &conn).await, Some(alice));
    }

    #[tokio::test]
    async fn test_unbind_current_connection_clears_mapping() {
        let m = mappings();
        let alice = UserId::new("alice");
        let conn = ConnectionId::new("127.0.0.1:1");
        m.bind(&alice, &conn).await.unwrap();

        assert!(m.unbind(&alice, &conn).await.unwrap());
        assert_eq!(m.connection_of(&alice).await.unwrap(), None);
        assert_eq!(user_on(&m, &conn).await, None);
    }

    #[tokio::test]
    async fn test_unbind_stale_connection_keeps_newer_mapping() {
        let m = mappings();
        let alice = UserId::new("alice");
        let old = ConnectionId::new("127.0.0.1:1");
        let new = ConnectionId::new("127.0.0.1:2");
        m.bind(&alice, &old).await.unwrap();
        m.bind(&alice, &new).await.unwrap();

        assert!(!m.unbind(&alice, &old).await.unwrap());
        assert_eq!(m.connection_of(&alice).await.unwrap(), Some(new));
    }
}
