//! Operation dispatch and notification fan-out.
//!
//! The orchestrator decides what changed; this module decides who hears
//! about it. Every operation answers the caller on its own connection and
//! pushes notifications to other users through the session mappings and
//! the connection registry:
//!
//! | Operation | Caller gets | Others get |
//! |---|---|---|
//! | `create_match` | `match_created` | — |
//! | `invite_friends` | `friends_invited` | `match_invitation` (each online invitee) |
//! | `respond_invite` | `invite_accepted` / `invite_declined` | `player_joined` (other participants, accept only) |
//! | `start_match` | `match_started` | `match_started` (other participants) |
//! | `leave_match` | `match_left` | `player_left` (remaining participants) |
//!
//! A failed operation answers the caller with exactly one `error`.

use matchforge_match::{InviteOutcome, LeaveOutcome, MatchError};
use matchforge_protocol::{
    ClientMessage, Codec, CreateMatchRequest, ErrorCode, FriendsInvited,
    InviteAnswer, InviteFriendsRequest, InviteResult, MatchCreated, MatchLeft,
    MatchStarted, PlayerEvent, RespondInviteRequest, ServerMessage,
    StartMatchRequest, UserId,
};
use matchforge_session::Authenticator;
use matchforge_store::SessionStore;
use matchforge_transport::Connection;

use crate::server::ServerState;
use crate::MatchforgeError;

/// Runs one operation for an authenticated `user`.
///
/// Returns `Err` only if the caller's own connection could not be
/// written to.
pub(crate) async fn dispatch<C, S, A, K>(
    conn: &C,
    server: &ServerState<C, S, A, K>,
    user: &UserId,
    message: ClientMessage,
) -> Result<(), MatchforgeError>
where
    C: Connection,
    S: SessionStore,
    A: Authenticator,
    K: Codec,
{
    let result = match message {
        ClientMessage::CreateMatch(req) => create_match(server, user, req).await,
        ClientMessage::InviteFriends(req) => invite_friends(server, user, req).await,
        ClientMessage::RespondInvite(req) => respond_invite(server, user, req).await,
        ClientMessage::StartMatch(req) => start_match(server, user, req).await,
        ClientMessage::LeaveMatch => leave_match(server, user).await,
        // Screened out by the handler before dispatch.
        ClientMessage::Auth(_) => Err(MatchError::FailedPrecondition(
            "Already authenticated".into(),
        )),
    };

    match result {
        Ok(reply) => send_to(conn, server, &reply).await,
        Err(e) => {
            let message = match e.code() {
                ErrorCode::Internal => {
                    tracing::warn!(%user, error = %e, "operation failed");
                    "Internal error".to_string()
                }
                _ => {
                    tracing::debug!(%user, error = %e, "operation rejected");
                    e.to_string()
                }
            };
            send_error(conn, server, e.code(), &message).await
        }
    }
}

async fn create_match<C, S, A, K>(
    server: &ServerState<C, S, A, K>,
    user: &UserId,
    req: CreateMatchRequest,
) -> Result<ServerMessage, MatchError>
where
    C: Connection,
    S: SessionStore,
    A: Authenticator,
    K: Codec,
{
    let record = server
        .orchestrator
        .create_match(user, &req.game_id, req.max_players)
        .await?;
    Ok(ServerMessage::MatchCreated(MatchCreated {
        match_id: record.match_id,
        game_id: record.game_id,
        host_id: record.host_id,
        max_players: record.max_players,
        message: "Match created successfully".into(),
    }))
}

async fn invite_friends<C, S, A, K>(
    server: &ServerState<C, S, A, K>,
    user: &UserId,
    req: InviteFriendsRequest,
) -> Result<ServerMessage, MatchError>
where
    C: Connection,
    S: SessionStore,
    A: Authenticator,
    K: Codec,
{
    let report = server
        .orchestrator
        .invite_friends(user, &req.match_id, &req.friend_ids)
        .await?;

    for (friend, invitation) in &report.invited {
        let delivered = push(
            server,
            std::slice::from_ref(friend),
            &ServerMessage::MatchInvitation(invitation.clone()),
        )
        .await;
        if delivered == 0 {
            tracing::debug!(%friend, match_id = %report.match_id, "invitation stored but not delivered");
        }
    }

    let invited_ids = report.invited_ids();
    Ok(ServerMessage::FriendsInvited(FriendsInvited {
        message: format!(
            "Invited {} friends, {} failed",
            invited_ids.len(),
            report.failed.len()
        ),
        match_id: report.match_id,
        invited_ids,
        failed_ids: report.failed,
    }))
}

async fn respond_invite<C, S, A, K>(
    server: &ServerState<C, S, A, K>,
    user: &UserId,
    req: RespondInviteRequest,
) -> Result<ServerMessage, MatchError>
where
    C: Connection,
    S: SessionStore,
    A: Authenticator,
    K: Codec,
{
    let outcome = server
        .orchestrator
        .respond_invite(user, &req.match_id, req.response)
        .await?;

    match outcome {
        InviteOutcome::Declined { match_id, .. } => {
            Ok(ServerMessage::InviteDeclined(InviteResult {
                match_id,
                user_id: user.clone(),
                response: InviteAnswer::Decline,
                message: "Invitation declined".into(),
            }))
        }
        InviteOutcome::Accepted(record) => {
            let others: Vec<UserId> = record
                .participants()
                .into_iter()
                .filter(|p| p != user)
                .collect();
            push(
                server,
                &others,
                &ServerMessage::PlayerJoined(PlayerEvent {
                    match_id: record.match_id.clone(),
                    user_id: user.clone(),
                    players: record.players,
                }),
            )
            .await;

            Ok(ServerMessage::InviteAccepted(InviteResult {
                match_id: record.match_id,
                user_id: user.clone(),
                response: InviteAnswer::Accept,
                message: "Successfully joined the match".into(),
            }))
        }
    }
}

async fn start_match<C, S, A, K>(
    server: &ServerState<C, S, A, K>,
    user: &UserId,
    req: StartMatchRequest,
) -> Result<ServerMessage, MatchError>
where
    C: Connection,
    S: SessionStore,
    A: Authenticator,
    K: Codec,
{
    let started = server.orchestrator.start_match(user, &req.match_id).await?;

    let notice = ServerMessage::MatchStarted(MatchStarted {
        match_id: started.record.match_id.clone(),
        game_id: started.record.game_id.clone(),
        teams: started.teams,
        message: "Match started!".into(),
    });
    let others: Vec<UserId> = started
        .record
        .participants()
        .into_iter()
        .filter(|p| p != user)
        .collect();
    push(server, &others, &notice).await;

    Ok(notice)
}

async fn leave_match<C, S, A, K>(
    server: &ServerState<C, S, A, K>,
    user: &UserId,
) -> Result<ServerMessage, MatchError>
where
    C: Connection,
    S: SessionStore,
    A: Authenticator,
    K: Codec,
{
    let outcome = leave_and_notify(server, user).await?;
    Ok(ServerMessage::MatchLeft(MatchLeft {
        match_id: outcome.match_id,
        message: "Left the match".into(),
    }))
}

/// Removes `user` from their match and tells the remaining participants.
///
/// Shared by the explicit `leave_match` operation and disconnect cleanup,
/// so an abrupt disconnect looks exactly like a leave to everyone else.
pub(crate) async fn leave_and_notify<C, S, A, K>(
    server: &ServerState<C, S, A, K>,
    user: &UserId,
) -> Result<LeaveOutcome, MatchError>
where
    C: Connection,
    S: SessionStore,
    A: Authenticator,
    K: Codec,
{
    let outcome = server.orchestrator.leave_match(user).await?;
    if !outcome.remaining.is_empty() {
        push(
            server,
            &outcome.remaining,
            &ServerMessage::PlayerLeft(PlayerEvent {
                match_id: outcome.match_id.clone(),
                user_id: user.clone(),
                players: outcome.players.clone(),
            }),
        )
        .await;
    }
    Ok(outcome)
}

/// Pushes `message` to every user in `users` that has a live connection.
/// Returns how many connections it reached.
///
/// Delivery is best effort: an offline user or a failed write is logged
/// and skipped, never reported to the caller.
async fn push<C, S, A, K>(
    server: &ServerState<C, S, A, K>,
    users: &[UserId],
    message: &ServerMessage,
) -> usize
where
    C: Connection,
    S: SessionStore,
    A: Authenticator,
    K: Codec,
{
    if users.is_empty() {
        return 0;
    }
    let bytes = match server.codec.encode(message) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "failed to encode notification");
            return 0;
        }
    };

    let mut delivered = 0;
    for user in users {
        let conn_id = match server.mappings.connection_of(user).await {
            Ok(Some(conn_id)) => conn_id,
            Ok(None) => {
                tracing::debug!(%user, "no live session, notification skipped");
                continue;
            }
            Err(e) => {
                tracing::warn!(%user, error = %e, "session lookup failed");
                continue;
            }
        };
        let Some(target) = server.registry.lookup(&conn_id).await else {
            tracing::debug!(%user, %conn_id, "mapped connection is gone");
            continue;
        };
        match target.send(&bytes).await {
            Ok(()) => delivered += 1,
            Err(e) => tracing::debug!(%user, %conn_id, error = %e, "push failed"),
        }
    }
    delivered
}

/// Encodes and sends `message` to `conn`.
pub(crate) async fn send_to<C, S, A, K>(
    conn: &C,
    server: &ServerState<C, S, A, K>,
    message: &ServerMessage,
) -> Result<(), MatchforgeError>
where
    C: Connection,
    S: SessionStore,
    A: Authenticator,
    K: Codec,
{
    let bytes = server.codec.encode(message)?;
    conn.send(&bytes).await?;
    Ok(())
}

/// Sends an `error` message to `conn`.
pub(crate) async fn send_error<C, S, A, K>(
    conn: &C,
    server: &ServerState<C, S, A, K>,
    code: ErrorCode,
    message: &str,
) -> Result<(), MatchforgeError>
where
    C: Connection,
    S: SessionStore,
    A: Authenticator,
    K: Codec,
{
    server.metrics.error_sent();
    send_to(conn, server, &ServerMessage::error(code, message)).await
}
