//! Lobby data types: identities, matches, invitations, and teams.
//!
//! These are both the payloads that travel on the wire and the records the
//! orchestrator persists in the session store, so the JSON shape defined
//! here is the storage format as well.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A verified subject identifier, as returned by the authenticator.
///
/// Newtype over `String` so a user id can't be passed where a match id is
/// expected. `#[serde(transparent)]` keeps it a plain JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wraps a subject identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A globally unique match identifier (UUID v4 text form when generated).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(String);

impl MatchId {
    /// Wraps an existing match identifier (e.g. one sent by a client).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrows the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the empty identifier a client sends when it
    /// omits the field's value.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MatchId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ---------------------------------------------------------------------------
// Match
// ---------------------------------------------------------------------------

/// Lifecycle status of a match.
///
/// ```text
/// Waiting ──(start_match)──→ Starting
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Lobby is open: invitations can be accepted.
    Waiting,
    /// The host started the match and teams were formed.
    Starting,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => f.write_str("waiting"),
            Self::Starting => f.write_str("starting"),
        }
    }
}

/// Join status of a player inside a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    Joined,
}

/// A player who accepted an invitation into a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPlayer {
    pub user_id: UserId,
    pub status: PlayerStatus,
    pub joined_at: DateTime<Utc>,
}

/// A lobby instance for one game session.
///
/// The host is a participant from creation but does not occupy a
/// `players` slot: `players` holds the invitees who accepted, in join
/// order, and never grows past `max_players`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub match_id: MatchId,
    pub game_id: String,
    pub host_id: UserId,
    /// Cleared when the host leaves; the match lives on for the players.
    #[serde(default = "default_true")]
    pub host_present: bool,
    pub status: MatchStatus,
    pub players: Vec<MatchPlayer>,
    /// Caps accepted invitees, not the roster: a full match with its host
    /// present has `max_players + 1` participants.
    pub max_players: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl Match {
    /// Returns `true` if `user` is the host of this match.
    pub fn is_host(&self, user: &UserId) -> bool {
        self.host_id == *user
    }

    /// Returns `true` if no more invitees can join. The host is not
    /// counted.
    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players as usize
    }

    /// Returns `true` if `user` is in the joined-player list.
    pub fn has_player(&self, user: &UserId) -> bool {
        self.players.iter().any(|p| p.user_id == *user)
    }

    /// Everyone currently in the match: the host (while present) first,
    /// then joined players in join order.
    pub fn participants(&self) -> Vec<UserId> {
        let host = self.host_present.then(|| self.host_id.clone());
        host.into_iter()
            .chain(self.players.iter().map(|p| p.user_id.clone()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Invitation
// ---------------------------------------------------------------------------

/// A time-limited offer for one subject to join one match.
///
/// `expires_at` travels as unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub match_id: MatchId,
    pub game_id: String,
    pub host_id: UserId,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
    pub message: String,
}

/// An invitee's answer to an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteAnswer {
    Accept,
    Decline,
}

impl fmt::Display for InviteAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accept => f.write_str("accept"),
            Self::Decline => f.write_str("decline"),
        }
    }
}

impl FromStr for InviteAnswer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accept" => Ok(Self::Accept),
            "decline" => Ok(Self::Decline),
            other => Err(format!(
                "response must be accept or decline, got {other:?}"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Team
// ---------------------------------------------------------------------------

/// One half of a started match. Teams are numbered 1 and 2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: u8,
    pub players: Vec<UserId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_match() -> Match {
        Match {
            match_id: MatchId::new("m-1"),
            game_id: "chess".into(),
            host_id: UserId::new("host"),
            host_present: true,
            status: MatchStatus::Waiting,
            players: vec![MatchPlayer {
                user_id: UserId::new("alice"),
                status: PlayerStatus::Joined,
                joined_at: Utc::now(),
            }],
            max_players: 2,
            created_at: Utc::now(),
            started_at: None,
        }
    }

    #[test]
    fn test_user_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&UserId::new("u-42")).unwrap();
        assert_eq!(json, "\"u-42\"");
    }

    #[test]
    fn test_match_id_generate_is_unique() {
        assert_ne!(MatchId::generate(), MatchId::generate());
    }

    #[test]
    fn test_match_serializes_camel_case_and_skips_missing_start() {
        let json = serde_json::to_value(sample_match()).unwrap();
        assert_eq!(json["matchId"], "m-1");
        assert_eq!(json["hostId"], "host");
        assert_eq!(json["maxPlayers"], 2);
        assert_eq!(json["status"], "waiting");
        assert_eq!(json["players"][0]["status"], "joined");
        assert!(json.get("startedAt").is_none());
    }

    #[test]
    fn test_match_record_without_host_present_defaults_true() {
        let mut json = serde_json::to_value(sample_match()).unwrap();
        json.as_object_mut().unwrap().remove("hostPresent");
        let m: Match = serde_json::from_value(json).unwrap();
        assert!(m.host_present);
    }

    #[test]
    fn test_participants_lists_host_first_then_players() {
        let m = sample_match();
        assert_eq!(
            m.participants(),
            vec![UserId::new("host"), UserId::new("alice")]
        );
    }

    #[test]
    fn test_participants_omits_departed_host() {
        let mut m = sample_match();
        m.host_present = false;
        assert_eq!(m.participants(), vec![UserId::new("alice")]);
    }

    #[test]
    fn test_is_full_counts_only_joined_players() {
        let mut m = sample_match();
        assert!(!m.is_full());
        m.players.push(MatchPlayer {
            user_id: UserId::new("bob"),
            status: PlayerStatus::Joined,
            joined_at: Utc::now(),
        });
        assert!(m.is_full());
        assert_eq!(m.participants().len(), m.max_players as usize + 1);
    }

    #[test]
    fn test_invitation_expiry_is_unix_seconds() {
        let inv = Invitation {
            match_id: MatchId::new("m-1"),
            game_id: "chess".into(),
            host_id: UserId::new("host"),
            expires_at: DateTime::from_timestamp(1_700_000_300, 0).unwrap(),
            message: "hi".into(),
        };
        let json = serde_json::to_value(&inv).unwrap();
        assert_eq!(json["expiresAt"], 1_700_000_300i64);
    }

    #[test]
    fn test_invite_answer_from_str_rejects_other_values() {
        assert_eq!("accept".parse::<InviteAnswer>(), Ok(InviteAnswer::Accept));
        assert_eq!("decline".parse::<InviteAnswer>(), Ok(InviteAnswer::Decline));
        assert!("maybe".parse::<InviteAnswer>().is_err());
    }
}
