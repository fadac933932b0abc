//! Error types for match orchestration.

use matchforge_protocol::{ErrorCode, MatchId, UserId};
use matchforge_store::StoreError;

/// Errors that can occur during match operations.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// A required field is missing or out of range.
    #[error("{0}")]
    InvalidArgument(String),

    /// The caller is not the host of the match.
    #[error("only the host can do this in match {0}")]
    NotHost(MatchId),

    /// The match does not exist (never created, or deleted after the last
    /// participant left).
    #[error("match {0} not found")]
    MatchNotFound(MatchId),

    /// No live invitation for this user and match. Expired, already
    /// answered, and never-sent invitations are indistinguishable.
    #[error("no pending invitation to match {match_id} for {user_id}")]
    InvitationNotFound { match_id: MatchId, user_id: UserId },

    /// The user has no recorded match.
    #[error("{0} is not in a match")]
    NotInMatch(UserId),

    /// The match already holds `max_players` joined players.
    #[error("match {0} is full")]
    MatchFull(MatchId),

    /// The match or the caller is in the wrong state for this operation.
    #[error("{0}")]
    FailedPrecondition(String),

    /// A stored record could not be (de)serialized.
    #[error("corrupt record at {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The session store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MatchError {
    /// The wire error category for this failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::NotHost(_) => ErrorCode::Forbidden,
            Self::MatchNotFound(_)
            | Self::InvitationNotFound { .. }
            | Self::NotInMatch(_) => ErrorCode::NotFound,
            Self::MatchFull(_) => ErrorCode::ResourceExhausted,
            Self::FailedPrecondition(_) => ErrorCode::FailedPrecondition,
            Self::Corrupt { .. } | Self::Store(_) => ErrorCode::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_covers_taxonomy() {
        let m = MatchId::new("m");
        assert_eq!(MatchError::InvalidArgument("x".into()).code(), ErrorCode::InvalidArgument);
        assert_eq!(MatchError::NotHost(m.clone()).code(), ErrorCode::Forbidden);
        assert_eq!(MatchError::MatchNotFound(m.clone()).code(), ErrorCode::NotFound);
        assert_eq!(
            MatchError::InvitationNotFound { match_id: m.clone(), user_id: UserId::new("u") }.code(),
            ErrorCode::NotFound
        );
        assert_eq!(MatchError::MatchFull(m).code(), ErrorCode::ResourceExhausted);
        assert_eq!(
            MatchError::FailedPrecondition("x".into()).code(),
            ErrorCode::FailedPrecondition
        );
        assert_eq!(
            MatchError::Store(StoreError::Unavailable("down".into())).code(),
            ErrorCode::Internal
        );
    }

    #[test]
    fn test_not_found_message_names_the_match() {
        let err = MatchError::MatchNotFound(MatchId::new("m-9"));
        assert_eq!(err.to_string(), "match m-9 not found");
    }
}
