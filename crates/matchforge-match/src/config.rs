//! Orchestrator configuration.

use std::time::Duration;

/// Smallest `max_players` a match can be created with.
pub const MIN_MAX_PLAYERS: u32 = 2;

/// Tunables for the [`Orchestrator`](crate::Orchestrator).
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// How long an invitation stays answerable.
    pub invite_ttl: Duration,

    /// Participants (host included) required before the host may start.
    pub min_players_to_start: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            invite_ttl: Duration::from_secs(5 * 60),
            min_players_to_start: 2,
        }
    }
}

impl MatchConfig {
    /// Overrides the invitation TTL.
    pub fn with_invite_ttl(mut self, ttl: Duration) -> Self {
        self.invite_ttl = ttl;
        self
    }
}
