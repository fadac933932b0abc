//! Unified error type for the Matchforge gateway.

use matchforge_match::MatchError;
use matchforge_protocol::ProtocolError;
use matchforge_session::SessionError;
use matchforge_transport::TransportError;

/// Top-level error for the layers that can end a connection or the server.
///
/// Operation failures (a full match, a bad token) never surface here:
/// they are answered with an `error` frame and the connection carries on.
/// A `MatchforgeError` means the server or one connection could not go on.
#[derive(Debug, thiserror::Error)]
pub enum MatchforgeError {
    /// Binding, accepting, or talking to a connection failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A reply could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Session mapping failure.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Orchestrator failure.
    #[error(transparent)]
    Match(#[from] MatchError),
}
