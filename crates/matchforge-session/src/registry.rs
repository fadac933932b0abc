//! The connection registry: every live connection, keyed by id.
//!
//! Connection handlers insert themselves on accept and remove themselves
//! on close; any handler can look up another connection to push a
//! notification to it. All access goes through a Tokio `RwLock`, so
//! concurrent pushes (lookups) never wait on each other, and the lock is
//! only held for the duration of a map operation.
//!
//! Each entry also carries an eviction signal. A handler waits on the
//! signal returned by [`ConnectionRegistry::register`] alongside its reads,
//! and stops as soon as another handler calls
//! [`ConnectionRegistry::evict`] on it.

use std::collections::HashMap;
use std::sync::Arc;

use matchforge_transport::{Connection, ConnectionId};
use tokio::sync::{Notify, RwLock};

struct Entry<C> {
    connection: Arc<C>,
    evicted: Arc<Notify>,
}

/// Concurrent map of live connections.
///
/// Cloning the registry is cheap and every clone sees the same map.
pub struct ConnectionRegistry<C: Connection> {
    connections: Arc<RwLock<HashMap<ConnectionId, Entry<C>>>>,
}

// Manual impl: `#[derive(Clone)]` would require `C: Clone`.
impl<C: Connection> Clone for ConnectionRegistry<C> {
    fn clone(&self) -> Self {
        Self {
            connections: Arc::clone(&self.connections),
        }
    }
}

impl<C: Connection> Default for ConnectionRegistry<C> {
    fn default() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<C: Connection> ConnectionRegistry<C> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `connection` under its own id, replacing any previous entry.
    ///
    /// Returns the entry's eviction signal. It fires once
    /// [`evict`](Self::evict) is called for this id, even if nobody was
    /// waiting on it at that moment.
    pub async fn register(&self, connection: Arc<C>) -> Arc<Notify> {
        let id = connection.id().clone();
        let evicted = Arc::new(Notify::new());
        let entry = Entry {
            connection,
            evicted: Arc::clone(&evicted),
        };
        self.connections.write().await.insert(id.clone(), entry);
        tracing::debug!(%id, "connection registered");
        evicted
    }

    /// Removes the connection with `id`, returning it if it was present.
    pub async fn unregister(&self, id: &ConnectionId) -> Option<Arc<C>> {
        let removed = self.connections.write().await.remove(id);
        if removed.is_some() {
            tracing::debug!(%id, "connection unregistered");
        }
        removed.map(|entry| entry.connection)
    }

    /// Returns the connection with `id`, or `None` if it is not live.
    pub async fn lookup(&self, id: &ConnectionId) -> Option<Arc<C>> {
        self.connections
            .read()
            .await
            .get(id)
            .map(|entry| Arc::clone(&entry.connection))
    }

    /// Fires the eviction signal of the connection with `id` and returns
    /// it. The entry stays registered until its handler unregisters it.
    pub async fn evict(&self, id: &ConnectionId) -> Option<Arc<C>> {
        let connections = self.connections.read().await;
        let entry = connections.get(id)?;
        entry.evicted.notify_one();
        tracing::debug!(%id, "connection evicted");
        Some(Arc::clone(&entry.connection))
    }

    /// Number of live connections.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Returns `true` if no connection is live.
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}
