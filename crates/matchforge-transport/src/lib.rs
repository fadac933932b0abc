//! Transport abstraction layer for Matchforge.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! the byte pipes a lobby client can use. Every implementation delivers
//! whole frames: one `recv()` yields exactly one logical message, never a
//! fragment of one and never two glued together.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket transport via `tokio-tungstenite`
//! - `tcp` (default) — raw TCP with 4-byte big-endian length prefixes

mod error;
#[cfg(feature = "tcp")]
mod tcp;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "tcp")]
pub use tcp::{FramedTcpConnection, FramedTcpTransport, DEFAULT_MAX_FRAME_LEN};
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;

/// Opaque identifier for a connection, derived from the peer endpoint.
///
/// Two live connections never share a peer `ip:port`, so the endpoint
/// string is unique for as long as the connection is open.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Creates a `ConnectionId` from an arbitrary string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derives the identifier from the remote peer's address.
    pub fn from_peer(addr: SocketAddr) -> Self {
        Self(addr.to_string())
    }

    /// Borrows the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the underlying string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;

    /// Waits for and accepts the next incoming connection.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;

    /// Returns the local address the transport is listening on.
    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

/// A single connection that can send and receive whole frames.
///
/// Sending and receiving may happen concurrently from different tasks:
/// the connection's own handler sits in `recv()` while other handlers
/// push notifications through `send()`.
pub trait Connection: Send + Sync + 'static {
    /// Sends one frame to the remote peer.
    fn send(
        &self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;

    /// Closes the connection.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> &ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_from_peer_uses_endpoint() {
        let addr: SocketAddr = "127.0.0.1:4242".parse().unwrap();
        let id = ConnectionId::from_peer(addr);
        assert_eq!(id.as_str(), "127.0.0.1:4242");
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new("10.0.0.7:9000");
        assert_eq!(id.to_string(), "conn-10.0.0.7:9000");
    }

    #[test]
    fn test_connection_id_equality() {
        let a = ConnectionId::new("a:1");
        let b = ConnectionId::new("a:1");
        let c = ConnectionId::new("a:2");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_connection_id_hash_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ConnectionId::new("a:1"), "alice");
        map.insert(ConnectionId::new("b:2"), "bob");
        assert_eq!(map[&ConnectionId::new("a:1")], "alice");
    }
}
