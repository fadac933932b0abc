//! Per-connection handler: the connection state machine.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//!
//! ```text
//!            auth ok       EOF / error / idle timeout / superseded
//! Connected ────────→ Authenticated ───────────────────────────→ Closed
//!   │  ↑                                                           ↑
//!   └──┘ anything else → error, stay                               │
//!   └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Messages on one connection are handled strictly one at a time: the
//! next frame is not read until the previous one has been answered.
//!
//! When the same user authenticates on another connection, the older
//! handler is evicted through the registry and stops before reading
//! another frame.

use std::sync::Arc;

use matchforge_match::MatchError;
use matchforge_protocol::{
    AuthRequest, AuthSuccess, ClientMessage, Codec, Decoded, ErrorCode, Inbound,
    ServerMessage, UserId,
};
use matchforge_session::{Authenticator, SessionError};
use matchforge_store::SessionStore;
use matchforge_transport::{Connection, ConnectionId};
use tokio::sync::Notify;

use crate::dispatch::{dispatch, leave_and_notify, send_error, send_to};
use crate::server::ServerState;
use crate::MatchforgeError;

/// Where a connection is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConnectionState {
    /// Transport open, no subject bound yet. Only `auth` is accepted.
    Connected,
    /// A subject is bound; every operation is dispatched.
    Authenticated(UserId),
    /// Terminal. Cleanup has run.
    Closed,
}

/// Runs disconnect cleanup exactly once.
///
/// On a normal exit the handler calls [`CleanupGuard::finish`] and the
/// cleanup runs inline. If the handler panics instead, `Drop` spawns the
/// same cleanup so the registry and the store don't keep a dead
/// connection.
struct CleanupGuard<C: Connection, S: SessionStore, A: Authenticator, K: Codec> {
    conn_id: ConnectionId,
    state: ConnectionState,
    server: Arc<ServerState<C, S, A, K>>,
}

impl<C, S, A, K> CleanupGuard<C, S, A, K>
where
    C: Connection,
    S: SessionStore,
    A: Authenticator,
    K: Codec,
{
    async fn finish(mut self) {
        let state = std::mem::replace(&mut self.state, ConnectionState::Closed);
        cleanup(&*self.server, &self.conn_id, state).await;
    }
}

impl<C: Connection, S: SessionStore, A: Authenticator, K: Codec> Drop
    for CleanupGuard<C, S, A, K>
{
    fn drop(&mut self) {
        let state = std::mem::replace(&mut self.state, ConnectionState::Closed);
        if state == ConnectionState::Closed {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                target: "matchforge::cleanup",
                conn_id = %self.conn_id,
                stage = "spawn",
                "no runtime to run disconnect cleanup"
            );
            self.server.metrics.cleanup_failed();
            return;
        };
        let server = Arc::clone(&self.server);
        let conn_id = self.conn_id.clone();
        runtime.spawn(async move {
            cleanup(&*server, &conn_id, state).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C, S, A, K>(
    conn: Arc<C>,
    server: Arc<ServerState<C, S, A, K>>,
) -> Result<(), MatchforgeError>
where
    C: Connection,
    S: SessionStore,
    A: Authenticator,
    K: Codec,
{
    let conn_id = conn.id().clone();
    let evicted = server.registry.register(Arc::clone(&conn)).await;
    server.metrics.connection_opened();
    tracing::debug!(%conn_id, "connection opened");

    let mut guard = CleanupGuard {
        conn_id,
        state: ConnectionState::Connected,
        server: Arc::clone(&server),
    };

    let result = message_loop(&*conn, &*server, &evicted, &mut guard.state).await;

    guard.finish().await;
    if let Err(e) = conn.close().await {
        tracing::debug!(conn_id = %conn.id(), error = %e, "close after cleanup failed");
    }
    result
}

/// Reads frames until the connection ends. Returns `Err` only when the
/// connection itself failed.
async fn message_loop<C, S, A, K>(
    conn: &C,
    server: &ServerState<C, S, A, K>,
    evicted: &Notify,
    state: &mut ConnectionState,
) -> Result<(), MatchforgeError>
where
    C: Connection,
    S: SessionStore,
    A: Authenticator,
    K: Codec,
{
    let conn_id = conn.id();

    loop {
        let received = tokio::select! {
            biased;
            () = evicted.notified() => {
                tracing::info!(%conn_id, "session superseded, closing");
                return Ok(());
            }
            received = tokio::time::timeout(server.config.idle_timeout, conn.recv()) => received,
        };
        let data = match received {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                return Ok(());
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                return Err(e.into());
            }
            Err(_) => {
                tracing::info!(%conn_id, "connection idle, closing");
                return Ok(());
            }
        };

        let message = match ClientMessage::decode(&server.codec, &data) {
            Decoded::Message(message) => message,
            Decoded::Rejected { kind, reason } => {
                tracing::debug!(%conn_id, %kind, error = %reason, "rejected frame");
                if *state == ConnectionState::Connected && kind != "auth" {
                    send_error(conn, server, ErrorCode::Unauthenticated, "Authentication required")
                        .await?;
                } else {
                    send_error(
                        conn,
                        server,
                        ErrorCode::InvalidArgument,
                        &format!("invalid {kind} message: {reason}"),
                    )
                    .await?;
                }
                continue;
            }
            Decoded::Unreadable(reason) => {
                tracing::warn!(%conn_id, error = %reason, len = data.len(), "dropping unreadable frame");
                server.metrics.frame_dropped();
                continue;
            }
        };

        let inbound = Inbound {
            origin: conn_id.clone(),
            message,
        };
        tracing::debug!(origin = %inbound.origin, kind = inbound.message.kind(), "message received");
        server.metrics.message_handled();

        match state {
            ConnectionState::Connected => {
                if let Some(user) = handle_unauthenticated(conn, server, inbound).await? {
                    *state = ConnectionState::Authenticated(user);
                }
            }
            ConnectionState::Authenticated(user) => {
                if let ClientMessage::Auth(_) = inbound.message {
                    send_error(conn, server, ErrorCode::FailedPrecondition, "Already authenticated")
                        .await?;
                    continue;
                }
                let user = user.clone();
                dispatch(conn, server, &user, inbound.message).await?;
            }
            ConnectionState::Closed => return Ok(()),
        }
    }
}

/// Handles a frame in the `Connected` state. Returns the subject once
/// authentication succeeds.
async fn handle_unauthenticated<C, S, A, K>(
    conn: &C,
    server: &ServerState<C, S, A, K>,
    inbound: Inbound,
) -> Result<Option<UserId>, MatchforgeError>
where
    C: Connection,
    S: SessionStore,
    A: Authenticator,
    K: Codec,
{
    let ClientMessage::Auth(AuthRequest { token }) = inbound.message else {
        send_error(conn, server, ErrorCode::Unauthenticated, "Authentication required").await?;
        return Ok(None);
    };

    if token.trim().is_empty() {
        send_error(conn, server, ErrorCode::InvalidArgument, "Token is required").await?;
        return Ok(None);
    }

    let user = match server.auth.authenticate(&token).await {
        Ok(user) => user,
        Err(e) => {
            server.metrics.auth_failed();
            tracing::info!(origin = %inbound.origin, error = %e, "authentication failed");
            let message = match &e {
                SessionError::AuthFailed(_) => "Invalid token".to_string(),
                other => other.to_string(),
            };
            send_error(conn, server, e.code(), &message).await?;
            return Ok(None);
        }
    };

    let replaced = match server.mappings.bind(&user, &inbound.origin).await {
        Ok(replaced) => replaced,
        Err(e) => {
            tracing::warn!(origin = %inbound.origin, %user, error = %e, "failed to record session");
            send_error(conn, server, e.code(), "Failed to record session").await?;
            return Ok(None);
        }
    };

    // Last authentication wins: the superseded handler stops reading, and
    // its cleanup leaves the new mapping alone.
    if let Some(old) = replaced {
        if let Some(stale) = server.registry.evict(&old).await {
            tracing::info!(%user, %old, "closing superseded connection");
            if let Err(e) = stale.close().await {
                tracing::debug!(%old, error = %e, "closing superseded connection failed");
            }
        }
    }

    server.metrics.authenticated();
    tracing::info!(origin = %inbound.origin, %user, "authenticated");
    send_to(
        conn,
        server,
        &ServerMessage::AuthSuccess(AuthSuccess {
            user_id: user.clone(),
        }),
    )
    .await?;
    Ok(Some(user))
}

/// Disconnect cleanup: registry entry, session mapping, match seat.
///
/// Never fails: every failure is reported on the `matchforge::cleanup`
/// target and counted in `cleanup_failures`.
async fn cleanup<C, S, A, K>(
    server: &ServerState<C, S, A, K>,
    conn_id: &ConnectionId,
    state: ConnectionState,
) where
    C: Connection,
    S: SessionStore,
    A: Authenticator,
    K: Codec,
{
    server.registry.unregister(conn_id).await;

    if let ConnectionState::Authenticated(user) = state {
        match server.mappings.unbind(&user, conn_id).await {
            Ok(true) => match leave_and_notify(server, &user).await {
                Ok(_) | Err(MatchError::NotInMatch(_)) => {}
                Err(e) => cleanup_failed(server, conn_id, &user, "leave_match", &e),
            },
            Ok(false) => {
                tracing::debug!(%conn_id, %user, "superseded connection closed, match seat kept");
            }
            Err(e) => cleanup_failed(server, conn_id, &user, "unbind", &e),
        }
    }

    server.metrics.connection_closed();
    tracing::info!(%conn_id, "connection cleaned up");
}

fn cleanup_failed<C, S, A, K>(
    server: &ServerState<C, S, A, K>,
    conn_id: &ConnectionId,
    user: &UserId,
    stage: &'static str,
    error: &dyn std::error::Error,
) where
    C: Connection,
    S: SessionStore,
    A: Authenticator,
    K: Codec,
{
    server.metrics.cleanup_failed();
    tracing::warn!(
        target: "matchforge::cleanup",
        %conn_id,
        %user,
        stage,
        error = %error,
        "disconnect cleanup failed"
    );
}
