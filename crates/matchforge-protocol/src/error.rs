//! Error types for the protocol layer.

/// Errors that can occur in the protocol layer.
///
/// A `ProtocolError` always means the problem is in turning bytes into
/// messages (or back), never in networking or match state.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields, unknown
    /// fields in a payload, or a value of the wrong type.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
