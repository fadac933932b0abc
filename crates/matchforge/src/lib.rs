//! # Matchforge
//!
//! Real-time lobby gateway: authenticated connections, match lobbies,
//! time-limited invitations, and two-team starts.
//!
//! Matchforge ties the layers together. The embedding application
//! supplies an [`Authenticator`](matchforge_session::Authenticator) and a
//! [`SessionStore`](matchforge_store::SessionStore); the gateway handles
//! transport, the connection state machine, and notification fan-out.
//!
//! ```text
//!  client ──frame──→ Transport ──bytes──→ handler (state machine)
//!                                             │ ClientMessage
//!                                             ↓
//!                         dispatch ──→ Orchestrator ──→ SessionStore
//!                             │
//!                             └──push──→ SessionMappings → ConnectionRegistry → other clients
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use matchforge::prelude::*;
//!
//! struct AnyToken;
//!
//! impl Authenticator for AnyToken {
//!     async fn authenticate(&self, token: &str) -> Result<UserId, SessionError> {
//!         Ok(UserId::new(token))
//!     }
//! }
//!
//! # async fn run() -> Result<(), MatchforgeError> {
//! let server = MatchforgeServerBuilder::new()
//!     .bind("0.0.0.0:8080")
//!     .build(Arc::new(MemoryStore::new()), AnyToken)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod dispatch;
mod error;
mod handler;
mod metrics;
mod server;

pub use config::{ConfigError, ServerConfig, TransportKind, MAX_INVITE_TTL};
pub use error::MatchforgeError;
pub use metrics::{GatewayMetrics, MetricsSnapshot};
pub use server::{MatchforgeServer, MatchforgeServerBuilder, ServerHandle};

/// Convenient imports for running a server.
///
/// ```rust
/// use matchforge::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        ConfigError, GatewayMetrics, MatchforgeError, MatchforgeServer,
        MatchforgeServerBuilder, MetricsSnapshot, ServerConfig, ServerHandle,
        TransportKind,
    };
    pub use matchforge_match::{MatchConfig, MatchError};
    pub use matchforge_protocol::{ErrorCode, MatchId, ServerMessage, UserId};
    pub use matchforge_session::{Authenticator, SessionError};
    pub use matchforge_store::{MemoryStore, SessionStore, StoreError};
}
