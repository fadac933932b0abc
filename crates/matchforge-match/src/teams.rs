//! Team formation at match start.

use matchforge_protocol::{Team, UserId};

/// Splits `roster` into teams 1 and 2 by alternating: the player at index
/// `i` goes to team `i % 2 + 1`. Deterministic, no shuffling, so the
/// sizes differ by at most one.
pub fn form_teams(roster: &[UserId]) -> Vec<Team> {
    let mut teams = vec![
        Team { id: 1, players: Vec::new() },
        Team { id: 2, players: Vec::new() },
    ];
    for (i, user) in roster.iter().enumerate() {
        teams[i % 2].players.push(user.clone());
    }
    teams
}
