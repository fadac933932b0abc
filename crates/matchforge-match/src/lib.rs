//! Match orchestration for Matchforge.
//!
//! The [`Orchestrator`] owns every state transition of a match: create,
//! invite, accept/decline, start, leave. It works purely against a
//! [`SessionStore`](matchforge_store::SessionStore) and never touches a
//! connection, so all of it can be tested without a network. Who gets
//! notified about what is decided by the caller from the values these
//! operations return.
//!
//! # Key types
//!
//! - [`Orchestrator`] — the operations
//! - [`MatchConfig`] — invitation TTL and start threshold
//! - [`MatchError`] — failures, each mapped to a wire
//!   [`ErrorCode`](matchforge_protocol::ErrorCode)
//! - [`form_teams`] — the deterministic two-team split used at start
//!
//! ```text
//!            create_match            start_match
//!  (none) ───────────────→ Waiting ─────────────→ Starting
//!                           │  ↑
//!          invite_friends   │  │ respond_invite(accept)
//!                           ↓  │
//!                       invite:{m}:{u} (TTL)
//! ```

mod config;
mod error;
mod locks;
mod orchestrator;
mod teams;

pub use config::MatchConfig;
pub use error::MatchError;
pub use orchestrator::{
    InviteOutcome, InviteReport, LeaveOutcome, Orchestrator, StartedMatch,
};
pub use teams::form_teams;
