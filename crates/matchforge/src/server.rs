//! `MatchforgeServer` builder and accept loop.
//!
//! This is the entry point for running a lobby server. It ties the layers
//! together: transport → protocol → session → orchestrator, all sharing
//! one [`SessionStore`].

use std::net::SocketAddr;
use std::sync::Arc;

use matchforge_match::Orchestrator;
use matchforge_protocol::{Codec, JsonCodec};
use matchforge_session::{Authenticator, ConnectionRegistry, SessionMappings};
use matchforge_store::SessionStore;
use matchforge_transport::{
    Connection, FramedTcpTransport, Transport, WebSocketTransport,
};

use crate::handler::handle_connection;
use crate::{GatewayMetrics, MatchforgeError, ServerConfig};

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. Nothing in
/// here is a process-wide singleton: every server (and every test) builds
/// its own.
pub(crate) struct ServerState<C: Connection, S: SessionStore, A: Authenticator, K: Codec> {
    pub(crate) registry: ConnectionRegistry<C>,
    pub(crate) mappings: SessionMappings<S>,
    pub(crate) orchestrator: Orchestrator<S>,
    pub(crate) auth: A,
    pub(crate) codec: K,
    pub(crate) config: ServerConfig,
    pub(crate) metrics: Arc<GatewayMetrics>,
}

/// Builder for configuring and starting a Matchforge server.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use matchforge::prelude::*;
///
/// let server = MatchforgeServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .build(Arc::new(MemoryStore::new()), my_auth)
///     .await?;
/// server.run().await
/// ```
pub struct MatchforgeServerBuilder {
    config: ServerConfig,
}

impl MatchforgeServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Replaces the whole configuration (bind address included).
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds a WebSocket server.
    pub async fn build<S, A>(
        self,
        store: Arc<S>,
        auth: A,
    ) -> Result<MatchforgeServer<WebSocketTransport, S, A, JsonCodec>, MatchforgeError>
    where
        S: SessionStore,
        A: Authenticator,
    {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;
        Ok(self.build_with(transport, store, auth))
    }

    /// Builds a length-prefixed TCP server.
    pub async fn build_tcp<S, A>(
        self,
        store: Arc<S>,
        auth: A,
    ) -> Result<MatchforgeServer<FramedTcpTransport, S, A, JsonCodec>, MatchforgeError>
    where
        S: SessionStore,
        A: Authenticator,
    {
        let transport =
            FramedTcpTransport::bind(&self.config.bind_addr, self.config.max_frame_len).await?;
        Ok(self.build_with(transport, store, auth))
    }

    /// Builds a server over an already-bound transport.
    pub fn build_with<T, S, A>(
        self,
        transport: T,
        store: Arc<S>,
        auth: A,
    ) -> MatchforgeServer<T, S, A, JsonCodec>
    where
        T: Transport,
        S: SessionStore,
        A: Authenticator,
    {
        let state = Arc::new(ServerState {
            registry: ConnectionRegistry::new(),
            mappings: SessionMappings::new(Arc::clone(&store)),
            orchestrator: Orchestrator::new(store, self.config.match_config()),
            auth,
            codec: JsonCodec,
            config: self.config,
            metrics: Arc::new(GatewayMetrics::new()),
        });
        MatchforgeServer { transport, state }
    }
}

impl Default for MatchforgeServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Matchforge server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct MatchforgeServer<T: Transport, S: SessionStore, A: Authenticator, K: Codec> {
    transport: T,
    state: Arc<ServerState<T::Connection, S, A, K>>,
}

impl<T, S, A, K> MatchforgeServer<T, S, A, K>
where
    T: Transport,
    S: SessionStore,
    A: Authenticator,
    K: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns a handle for observing the server after `run()` has taken
    /// ownership of it.
    pub fn handle(&self) -> ServerHandle<T::Connection> {
        ServerHandle {
            registry: self.state.registry.clone(),
            metrics: Arc::clone(&self.state.metrics),
        }
    }

    /// Runs the accept loop.
    ///
    /// Spawns one handler task per accepted connection. Runs until the
    /// process is terminated; a failed accept is logged and skipped.
    pub async fn run(mut self) -> Result<(), MatchforgeError> {
        tracing::info!(
            addr = ?self.transport.local_addr().ok(),
            idle_timeout = ?self.state.config.idle_timeout,
            "Matchforge server running"
        );

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        let conn_id = conn.id().clone();
                        if let Err(e) = handle_connection(Arc::new(conn), state).await {
                            tracing::debug!(%conn_id, error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Read-only view of a running server.
pub struct ServerHandle<C: Connection> {
    registry: ConnectionRegistry<C>,
    metrics: Arc<GatewayMetrics>,
}

impl<C: Connection> Clone for ServerHandle<C> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<C: Connection> ServerHandle<C> {
    /// Number of connections currently in the registry.
    pub async fn connection_count(&self) -> usize {
        self.registry.len().await
    }

    /// The server's counters.
    pub fn metrics(&self) -> &GatewayMetrics {
        &self.metrics
    }
}
