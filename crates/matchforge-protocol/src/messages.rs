//! Inbound and outbound lobby messages.
//!
//! Every frame is a JSON object with a string `type` tag and a `payload`:
//!
//! ```text
//! { "type": "invite_friends", "payload": { "matchId": "…", "friendIds": ["…"] } }
//! ```
//!
//! `#[serde(tag = "type", content = "payload")]` produces exactly that
//! "adjacently tagged" shape. Payload structs use `camelCase` field names
//! and inbound ones reject unknown fields, so a typo in a client surfaces
//! as an error instead of a silently ignored field.

use serde::{Deserialize, Serialize};

use matchforge_transport::ConnectionId;

use crate::{
    Codec, Invitation, InviteAnswer, MatchId, MatchPlayer, ProtocolError, Team,
    UserId,
};

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// `auth` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AuthRequest {
    pub token: String,
}

/// `create_match` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateMatchRequest {
    pub game_id: String,
    pub max_players: u32,
}

/// `invite_friends` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InviteFriendsRequest {
    pub match_id: MatchId,
    pub friend_ids: Vec<UserId>,
}

/// `respond_invite` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RespondInviteRequest {
    pub match_id: MatchId,
    pub response: InviteAnswer,
}

/// `start_match` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StartMatchRequest {
    pub match_id: MatchId,
}

/// Every operation a client can request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Must be the first accepted message on a connection.
    Auth(AuthRequest),
    CreateMatch(CreateMatchRequest),
    InviteFriends(InviteFriendsRequest),
    RespondInvite(RespondInviteRequest),
    StartMatch(StartMatchRequest),
    /// No payload: the server knows which match the caller occupies.
    LeaveMatch,
}

impl ClientMessage {
    /// The wire `type` tag of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::CreateMatch(_) => "create_match",
            Self::InviteFriends(_) => "invite_friends",
            Self::RespondInvite(_) => "respond_invite",
            Self::StartMatch(_) => "start_match",
            Self::LeaveMatch => "leave_match",
        }
    }

    /// Decodes one inbound frame in two stages.
    ///
    /// A frame that parses as a full [`ClientMessage`] is returned as
    /// [`Decoded::Message`]. Otherwise the frame is re-read as a bare
    /// `{ "type": … }` header: if that works the client sent a structured
    /// message with an unknown type or a bad payload
    /// ([`Decoded::Rejected`]); if even the header fails the frame is
    /// [`Decoded::Unreadable`].
    pub fn decode(codec: &impl Codec, data: &[u8]) -> Decoded {
        match codec.decode::<ClientMessage>(data) {
            Ok(msg) => Decoded::Message(msg),
            Err(reason) => match codec.decode::<FrameHeader>(data) {
                Ok(header) => Decoded::Rejected {
                    kind: header.kind,
                    reason,
                },
                Err(_) => Decoded::Unreadable(reason),
            },
        }
    }
}

/// Just the `type` tag of a frame; every other field is ignored.
#[derive(Debug, Deserialize)]
struct FrameHeader {
    #[serde(rename = "type")]
    kind: String,
}

/// Result of [`ClientMessage::decode`].
#[derive(Debug)]
pub enum Decoded {
    /// A well-formed, recognized message.
    Message(ClientMessage),
    /// A structured frame whose type is unknown or whose payload has the
    /// wrong shape. `kind` is the `type` tag the client sent.
    Rejected { kind: String, reason: ProtocolError },
    /// Not a structured message at all.
    Unreadable(ProtocolError),
}

/// A decoded client message stamped with the connection it arrived on.
///
/// `origin` is filled in by the gateway from the transport, never read
/// from the frame, so a client cannot claim to be another connection.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub origin: ConnectionId,
    pub message: ClientMessage,
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// Machine-readable error category carried by every `error` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed or missing required fields.
    InvalidArgument,
    /// Not authenticated yet, or the credential was rejected.
    Unauthenticated,
    /// Caller lacks the required role (not the match host).
    Forbidden,
    /// Match, invitation, or session mapping absent.
    NotFound,
    /// Match is full.
    ResourceExhausted,
    /// Operation not allowed in the current state.
    FailedPrecondition,
    /// Store unavailable, serialization failure, or an unexpected fault.
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSuccess {
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchCreated {
    pub match_id: MatchId,
    pub game_id: String,
    pub host_id: UserId,
    pub max_players: u32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendsInvited {
    pub match_id: MatchId,
    pub invited_ids: Vec<UserId>,
    pub failed_ids: Vec<UserId>,
    pub message: String,
}

/// Payload of both `invite_accepted` and `invite_declined`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteResult {
    pub match_id: MatchId,
    pub user_id: UserId,
    pub response: InviteAnswer,
    pub message: String,
}

/// Payload of both `player_joined` and `player_left`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEvent {
    pub match_id: MatchId,
    pub user_id: UserId,
    pub players: Vec<MatchPlayer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStarted {
    pub match_id: MatchId,
    pub game_id: String,
    pub teams: Vec<Team>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchLeft {
    pub match_id: MatchId,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
}

/// Every message the server sends, as replies or pushed notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    AuthSuccess(AuthSuccess),
    MatchCreated(MatchCreated),
    FriendsInvited(FriendsInvited),
    /// Pushed to each online invitee.
    MatchInvitation(Invitation),
    InviteAccepted(InviteResult),
    InviteDeclined(InviteResult),
    /// Pushed to the other participants when an invitee joins.
    PlayerJoined(PlayerEvent),
    /// Pushed to every participant when the host starts the match.
    MatchStarted(MatchStarted),
    /// Pushed to the remaining participants when someone leaves.
    PlayerLeft(PlayerEvent),
    MatchLeft(MatchLeft),
    Error(ErrorPayload),
}

impl ServerMessage {
    /// Shorthand for an `error` message.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            code,
            message: message.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    //! JSON shape tests. Clients parse these frames by hand, so a change
    //! in tag names or field casing is a breaking change.

    use super::*;
    use crate::JsonCodec;

    fn decode(json: &str) -> Decoded {
        ClientMessage::decode(&JsonCodec, json.as_bytes())
    }

    #[test]
    fn test_client_message_uses_type_and_payload_keys() {
        let msg = ClientMessage::CreateMatch(CreateMatchRequest {
            game_id: "chess".into(),
            max_players: 4,
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "create_match");
        assert_eq!(json["payload"]["gameId"], "chess");
        assert_eq!(json["payload"]["maxPlayers"], 4);
    }

    #[test]
    fn test_decode_invite_friends() {
        let decoded = decode(
            r#"{"type":"invite_friends","payload":{"matchId":"m-1","friendIds":["a","b"]}}"#,
        );
        match decoded {
            Decoded::Message(ClientMessage::InviteFriends(req)) => {
                assert_eq!(req.match_id, MatchId::new("m-1"));
                assert_eq!(req.friend_ids, vec![UserId::new("a"), UserId::new("b")]);
            }
            other => panic!("expected InviteFriends, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_leave_match_without_payload() {
        assert!(matches!(
            decode(r#"{"type":"leave_match"}"#),
            Decoded::Message(ClientMessage::LeaveMatch)
        ));
    }

    #[test]
    fn test_decode_ignores_client_supplied_origin() {
        // `origin` is stamped server-side; a client copy is just noise.
        assert!(matches!(
            decode(r#"{"type":"leave_match","origin":"10.0.0.1:1"}"#),
            Decoded::Message(ClientMessage::LeaveMatch)
        ));
    }

    #[test]
    fn test_decode_unknown_type_is_rejected_with_kind() {
        match decode(r#"{"type":"fly_to_moon","payload":{}}"#) {
            Decoded::Rejected { kind, .. } => assert_eq!(kind, "fly_to_moon"),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_unknown_payload_field_is_rejected() {
        match decode(r#"{"type":"start_match","payload":{"matchId":"m","force":true}}"#) {
            Decoded::Rejected { kind, .. } => assert_eq!(kind, "start_match"),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_bad_invite_answer_is_rejected() {
        assert!(matches!(
            decode(r#"{"type":"respond_invite","payload":{"matchId":"m","response":"maybe"}}"#),
            Decoded::Rejected { .. }
        ));
    }

    #[test]
    fn test_decode_negative_max_players_is_rejected() {
        assert!(matches!(
            decode(r#"{"type":"create_match","payload":{"gameId":"g","maxPlayers":-1}}"#),
            Decoded::Rejected { .. }
        ));
    }

    #[test]
    fn test_decode_garbage_is_unreadable() {
        assert!(matches!(decode("not json at all"), Decoded::Unreadable(_)));
        assert!(matches!(decode(r#"{"name":"no type"}"#), Decoded::Unreadable(_)));
    }

    #[test]
    fn test_kind_matches_serialized_tag() {
        let msg = ClientMessage::RespondInvite(RespondInviteRequest {
            match_id: MatchId::new("m"),
            response: InviteAnswer::Decline,
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], msg.kind());
        assert_eq!(json["payload"]["response"], "decline");
    }

    #[test]
    fn test_error_message_carries_structured_code() {
        let msg = ServerMessage::error(ErrorCode::ResourceExhausted, "match is full");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["payload"]["code"], "RESOURCE_EXHAUSTED");
        assert_eq!(json["payload"]["message"], "match is full");
    }

    #[test]
    fn test_friends_invited_json_format() {
        let msg = ServerMessage::FriendsInvited(FriendsInvited {
            match_id: MatchId::new("m"),
            invited_ids: vec![UserId::new("a")],
            failed_ids: vec![],
            message: "Invited 1 friends, 0 failed".into(),
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "friends_invited");
        assert_eq!(json["payload"]["invitedIds"][0], "a");
        assert!(json["payload"]["failedIds"].as_array().unwrap().is_empty());
    }
}
