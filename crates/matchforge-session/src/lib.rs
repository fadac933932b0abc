//! Session layer for Matchforge.
//!
//! This crate answers "who is on the other end of this connection, and
//! where can I reach user X":
//!
//! 1. **Authentication** — turning a credential into a [`UserId`]
//!    ([`Authenticator`] trait, implemented by the embedding application)
//! 2. **Live connections** — every open connection keyed by its
//!    [`ConnectionId`] ([`ConnectionRegistry`])
//! 3. **Session mappings** — the subject ↔ connection association,
//!    persisted in the shared store ([`SessionMappings`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Gateway (above)  ← binds users on auth, unbinds on close, routes pushes
//!     ↕
//! Session layer (this crate)
//!     ↕
//! Transport + Store (below)  ← connections, shared key-value state
//! ```
//!
//! [`UserId`]: matchforge_protocol::UserId
//! [`ConnectionId`]: matchforge_transport::ConnectionId

mod auth;
mod error;
mod mappings;
mod registry;

pub use auth::Authenticator;
pub use error::SessionError;
pub use mappings::SessionMappings;
pub use registry::ConnectionRegistry;
