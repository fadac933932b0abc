//! Error types for the store layer.

/// Errors a [`SessionStore`](crate::SessionStore) backend can report.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached or refused the command.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A string command hit a hash key or vice versa.
    #[error("wrong value type at key {0}")]
    WrongType(String),
}
