//! Error types for the session layer.

use matchforge_protocol::ErrorCode;
use matchforge_store::StoreError;

/// Errors that can occur while authenticating or mapping a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The credential was rejected by the
    /// [`Authenticator`](crate::Authenticator).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// Reading or writing a session mapping failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SessionError {
    /// The wire error category for this failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::AuthFailed(_) => ErrorCode::Unauthenticated,
            Self::Store(_) => ErrorCode::Internal,
        }
    }
}
