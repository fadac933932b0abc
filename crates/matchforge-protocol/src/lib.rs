//! Wire protocol for Matchforge.
//!
//! This crate defines the "language" that lobby clients and the server
//! speak:
//!
//! - **Types** ([`UserId`], [`MatchId`], [`Match`], [`Invitation`],
//!   [`Team`]) — the records that travel on the wire and sit in the
//!   session store.
//! - **Messages** ([`ClientMessage`], [`ServerMessage`]) — tagged unions
//!   over every inbound operation and outbound reply/notification.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`], [`ErrorCode`]).
//!
//! ```text
//! Transport (frames) → Protocol (ClientMessage) → Gateway → Orchestrator
//! ```

mod codec;
mod error;
mod messages;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use messages::{
    AuthRequest, AuthSuccess, ClientMessage, CreateMatchRequest, Decoded,
    ErrorCode, ErrorPayload, FriendsInvited, Inbound, InviteFriendsRequest,
    InviteResult, MatchCreated, MatchLeft, MatchStarted, PlayerEvent,
    RespondInviteRequest, ServerMessage, StartMatchRequest,
};
pub use types::{
    Invitation, InviteAnswer, Match, MatchId, MatchPlayer, MatchStatus,
    PlayerStatus, Team, UserId,
};
