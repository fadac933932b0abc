//! The match orchestrator: every state transition of a match.
//!
//! All state lives in the [`SessionStore`]:
//!
//! - `matches[match_id]` — the serialized [`Match`]
//! - `user:matches[user_id]` — the match a user occupies (at most one)
//! - `invite:{match_id}:{user_id}` — a pending [`Invitation`], with TTL
//! - `user:sockets[user_id]` — read only, to tell whether an invitee is
//!   online
//!
//! Mutations of one match are serialized through a per-match lock. An
//! invitation is consumed with an atomic take, so two responses to the
//! same invitation can never both succeed.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use matchforge_protocol::{
    Invitation, InviteAnswer, Match, MatchId, MatchPlayer, MatchStatus,
    PlayerStatus, Team, UserId,
};
use matchforge_store::{SessionStore, keys};

use crate::config::MIN_MAX_PLAYERS;
use crate::locks::MatchLocks;
use crate::{MatchConfig, MatchError, form_teams};

/// Result of [`Orchestrator::invite_friends`]: a per-recipient partition.
#[derive(Debug, Clone)]
pub struct InviteReport {
    pub match_id: MatchId,
    /// Invitees that now hold a live invitation, with the invitation to
    /// push to them.
    pub invited: Vec<(UserId, Invitation)>,
    /// Invitees that are offline, already in this match, or whose
    /// invitation could not be stored.
    pub failed: Vec<UserId>,
}

impl InviteReport {
    /// Ids of the successfully invited users, in request order.
    pub fn invited_ids(&self) -> Vec<UserId> {
        self.invited.iter().map(|(user, _)| user.clone()).collect()
    }
}

/// Result of [`Orchestrator::respond_invite`].
#[derive(Debug, Clone)]
pub enum InviteOutcome {
    /// The invitation was consumed and nothing else changed.
    Declined { match_id: MatchId, host_id: UserId },
    /// The user joined; carries the updated match.
    Accepted(Match),
}

/// Result of [`Orchestrator::start_match`].
#[derive(Debug, Clone)]
pub struct StartedMatch {
    pub record: Match,
    pub teams: Vec<Team>,
}

/// Result of [`Orchestrator::leave_match`].
#[derive(Debug, Clone)]
pub struct LeaveOutcome {
    pub match_id: MatchId,
    /// Participants still in the match after the departure.
    pub remaining: Vec<UserId>,
    /// Joined players after the departure.
    pub players: Vec<MatchPlayer>,
    /// `true` if the departure emptied the match and its record was
    /// deleted.
    pub deleted: bool,
}

/// Authoritative match state machine over a [`SessionStore`].
///
/// Share it between connection handlers behind an `Arc`.
pub struct Orchestrator<S> {
    store: Arc<S>,
    config: MatchConfig,
    locks: MatchLocks,
}

impl<S: SessionStore> Orchestrator<S> {
    /// Creates an orchestrator over `store`.
    pub fn new(store: Arc<S>, config: MatchConfig) -> Self {
        Self {
            store,
            config,
            locks: MatchLocks::default(),
        }
    }

    /// Creates a match hosted by `host`.
    ///
    /// # Errors
    /// - [`MatchError::InvalidArgument`] — empty `game_id` or
    ///   `max_players < 2`
    /// - [`MatchError::FailedPrecondition`] — `host` already occupies a
    ///   match
    pub async fn create_match(
        &self,
        host: &UserId,
        game_id: &str,
        max_players: u32,
    ) -> Result<Match, MatchError> {
        if game_id.trim().is_empty() {
            return Err(MatchError::InvalidArgument("gameId is required".into()));
        }
        if max_players < MIN_MAX_PLAYERS {
            return Err(MatchError::InvalidArgument(format!(
                "maxPlayers must be at least {MIN_MAX_PLAYERS}"
            )));
        }
        if let Some(current) = self.current_match(host).await? {
            return Err(MatchError::FailedPrecondition(format!(
                "already in match {current}"
            )));
        }

        // UUID v4 collisions are practically impossible, but the store is
        // the authority on which ids have been used.
        let mut match_id = MatchId::generate();
        while self
            .store
            .hget(keys::MATCHES, match_id.as_str())
            .await?
            .is_some()
        {
            match_id = MatchId::generate();
        }

        let record = Match {
            match_id: match_id.clone(),
            game_id: game_id.to_string(),
            host_id: host.clone(),
            host_present: true,
            status: MatchStatus::Waiting,
            players: Vec::new(),
            max_players,
            created_at: Utc::now(),
            started_at: None,
        };
        self.save_match(&record).await?;
        self.store
            .hset(keys::USER_MATCHES, host.as_str(), match_id.to_string())
            .await?;

        tracing::info!(%match_id, %host, game_id, max_players, "match created");
        Ok(record)
    }

    /// Invites each of `friend_ids` to `match_id`.
    ///
    /// Degrades per recipient: an offline friend, one already in the
    /// match, or one whose invitation cannot be stored lands in
    /// [`InviteReport::failed`] without failing the call. Inviting the
    /// same friend again replaces the earlier invitation and its expiry.
    ///
    /// # Errors
    /// - [`MatchError::InvalidArgument`] — empty `match_id` or `friend_ids`
    /// - [`MatchError::MatchNotFound`]
    /// - [`MatchError::NotHost`] — caller is not the (present) host
    pub async fn invite_friends(
        &self,
        host: &UserId,
        match_id: &MatchId,
        friend_ids: &[UserId],
    ) -> Result<InviteReport, MatchError> {
        if match_id.is_empty() {
            return Err(MatchError::InvalidArgument("matchId is required".into()));
        }
        if friend_ids.is_empty() {
            return Err(MatchError::InvalidArgument("friendIds is required".into()));
        }

        let record = self.load_match(match_id).await?;
        if !(record.is_host(host) && record.host_present) {
            return Err(MatchError::NotHost(match_id.clone()));
        }

        let participants = record.participants();
        let mut seen = HashSet::new();
        let mut report = InviteReport {
            match_id: match_id.clone(),
            invited: Vec::new(),
            failed: Vec::new(),
        };

        for friend in friend_ids {
            if !seen.insert(friend) {
                continue;
            }
            if participants.contains(friend) {
                report.failed.push(friend.clone());
                continue;
            }
            match self.send_invitation(&record, friend).await {
                Ok(Some(invitation)) => report.invited.push((friend.clone(), invitation)),
                Ok(None) => report.failed.push(friend.clone()),
                Err(err) => {
                    tracing::warn!(%match_id, %friend, error = %err, "failed to store invitation");
                    report.failed.push(friend.clone());
                }
            }
        }

        tracing::info!(
            %match_id,
            invited = report.invited.len(),
            failed = report.failed.len(),
            "friends invited"
        );
        Ok(report)
    }

    /// Writes one invitation if `friend` is online. `Ok(None)` means
    /// offline.
    async fn send_invitation(
        &self,
        record: &Match,
        friend: &UserId,
    ) -> Result<Option<Invitation>, MatchError> {
        let online = self
            .store
            .hget(keys::USER_SOCKETS, friend.as_str())
            .await?
            .is_some();
        if !online {
            return Ok(None);
        }

        let ttl = self.config.invite_ttl;
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let invitation = Invitation {
            match_id: record.match_id.clone(),
            game_id: record.game_id.clone(),
            host_id: record.host_id.clone(),
            expires_at,
            message: format!("You are invited to join match for {}", record.game_id),
        };

        let key = keys::invite(record.match_id.as_str(), friend.as_str());
        let json = serde_json::to_string(&invitation)
            .map_err(|source| MatchError::Corrupt { key: key.clone(), source })?;
        self.store.set(&key, json, Some(ttl)).await?;
        Ok(Some(invitation))
    }

    /// Answers the invitation of `user` to `match_id`.
    ///
    /// The invitation is consumed before anything else is checked, so a
    /// second response (or one after the TTL) always fails with
    /// [`MatchError::InvitationNotFound`].
    ///
    /// # Errors
    /// - [`MatchError::InvalidArgument`] — empty `match_id`
    /// - [`MatchError::InvitationNotFound`] — expired, answered, or never sent
    /// - on accept: [`MatchError::MatchNotFound`], [`MatchError::MatchFull`],
    ///   or [`MatchError::FailedPrecondition`] when the match has started or
    ///   `user` already occupies a match
    pub async fn respond_invite(
        &self,
        user: &UserId,
        match_id: &MatchId,
        answer: InviteAnswer,
    ) -> Result<InviteOutcome, MatchError> {
        if match_id.is_empty() {
            return Err(MatchError::InvalidArgument("matchId is required".into()));
        }

        let key = keys::invite(match_id.as_str(), user.as_str());
        let invitation: Invitation = match self.store.take(&key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|source| MatchError::Corrupt { key, source })?,
            None => {
                return Err(MatchError::InvitationNotFound {
                    match_id: match_id.clone(),
                    user_id: user.clone(),
                });
            }
        };

        if answer == InviteAnswer::Decline {
            tracing::info!(%match_id, %user, "invitation declined");
            return Ok(InviteOutcome::Declined {
                match_id: match_id.clone(),
                host_id: invitation.host_id,
            });
        }

        let _guard = self.locks.acquire(match_id).await;

        if let Some(current) = self.current_match(user).await? {
            return Err(MatchError::FailedPrecondition(format!(
                "already in match {current}"
            )));
        }
        let mut record = self.load_match(match_id).await?;
        if record.status != MatchStatus::Waiting {
            return Err(MatchError::FailedPrecondition(format!(
                "match {match_id} has already started"
            )));
        }
        if record.is_full() {
            return Err(MatchError::MatchFull(match_id.clone()));
        }

        record.players.push(MatchPlayer {
            user_id: user.clone(),
            status: PlayerStatus::Joined,
            joined_at: Utc::now(),
        });
        self.save_match(&record).await?;
        self.store
            .hset(keys::USER_MATCHES, user.as_str(), match_id.to_string())
            .await?;

        tracing::info!(
            %match_id,
            %user,
            players = record.players.len(),
            max_players = record.max_players,
            "player joined"
        );
        Ok(InviteOutcome::Accepted(record))
    }

    /// Starts `match_id` and forms the two teams.
    ///
    /// # Errors
    /// - [`MatchError::MatchNotFound`]
    /// - [`MatchError::NotHost`] — caller is not the (present) host
    /// - [`MatchError::FailedPrecondition`] — already started, or fewer
    ///   participants than `min_players_to_start`
    pub async fn start_match(
        &self,
        host: &UserId,
        match_id: &MatchId,
    ) -> Result<StartedMatch, MatchError> {
        if match_id.is_empty() {
            return Err(MatchError::InvalidArgument("matchId is required".into()));
        }

        let _guard = self.locks.acquire(match_id).await;

        let mut record = self.load_match(match_id).await?;
        if !(record.is_host(host) && record.host_present) {
            return Err(MatchError::NotHost(match_id.clone()));
        }
        if record.status != MatchStatus::Waiting {
            return Err(MatchError::FailedPrecondition(format!(
                "match {match_id} has already started"
            )));
        }
        let roster = record.participants();
        if roster.len() < self.config.min_players_to_start {
            return Err(MatchError::FailedPrecondition(format!(
                "need at least {} players to start",
                self.config.min_players_to_start
            )));
        }

        record.status = MatchStatus::Starting;
        record.started_at = Some(Utc::now());
        let teams = form_teams(&roster);
        self.save_match(&record).await?;

        tracing::info!(%match_id, players = roster.len(), "match started");
        Ok(StartedMatch { record, teams })
    }

    /// Removes `user` from the match they occupy.
    ///
    /// A departing host stops being a participant; a departing player
    /// frees their slot. When nobody is left the match record is deleted.
    ///
    /// # Errors
    /// - [`MatchError::NotInMatch`] — `user` has no recorded match
    pub async fn leave_match(&self, user: &UserId) -> Result<LeaveOutcome, MatchError> {
        let match_id = self
            .current_match(user)
            .await?
            .ok_or_else(|| MatchError::NotInMatch(user.clone()))?;

        let _guard = self.locks.acquire(&match_id).await;

        self.store.hdel(keys::USER_MATCHES, user.as_str()).await?;

        let mut record = match self.load_match(&match_id).await {
            Ok(record) => record,
            Err(MatchError::MatchNotFound(_)) => {
                tracing::warn!(%match_id, %user, "mapping pointed at a deleted match");
                return Ok(LeaveOutcome {
                    match_id,
                    remaining: Vec::new(),
                    players: Vec::new(),
                    deleted: true,
                });
            }
            Err(err) => return Err(err),
        };

        if record.is_host(user) {
            record.host_present = false;
        }
        record.players.retain(|p| p.user_id != *user);

        let remaining = record.participants();
        let deleted = remaining.is_empty();
        if deleted {
            self.store.hdel(keys::MATCHES, match_id.as_str()).await?;
            tracing::info!(%match_id, "last participant left, match deleted");
        } else {
            self.save_match(&record).await?;
        }

        tracing::info!(%match_id, %user, remaining = remaining.len(), "player left");
        Ok(LeaveOutcome {
            match_id,
            remaining,
            players: record.players,
            deleted,
        })
    }

    /// Returns the match record.
    pub async fn get_match(&self, match_id: &MatchId) -> Result<Match, MatchError> {
        self.load_match(match_id).await
    }

    /// Returns everyone currently in the match: the host (while present)
    /// first, then joined players in join order.
    pub async fn get_match_players(
        &self,
        match_id: &MatchId,
    ) -> Result<Vec<UserId>, MatchError> {
        Ok(self.load_match(match_id).await?.participants())
    }

    /// The match `user` currently occupies, if any.
    pub async fn current_match(&self, user: &UserId) -> Result<Option<MatchId>, MatchError> {
        let id = self.store.hget(keys::USER_MATCHES, user.as_str()).await?;
        Ok(id.map(MatchId::new))
    }

    async fn load_match(&self, match_id: &MatchId) -> Result<Match, MatchError> {
        let raw = self
            .store
            .hget(keys::MATCHES, match_id.as_str())
            .await?
            .ok_or_else(|| MatchError::MatchNotFound(match_id.clone()))?;
        serde_json::from_str(&raw).map_err(|source| MatchError::Corrupt {
            key: format!("{}[{match_id}]", keys::MATCHES),
            source,
        })
    }

    async fn save_match(&self, record: &Match) -> Result<(), MatchError> {
        let json = serde_json::to_string(record).map_err(|source| MatchError::Corrupt {
            key: format!("{}[{}]", keys::MATCHES, record.match_id),
            source,
        })?;
        self.store
            .hset(keys::MATCHES, record.match_id.as_str(), json)
            .await?;
        Ok(())
    }
}
