//! Key layout shared by everything that reads or writes the store.
//!
//! ```text
//! matches        hash   match-id   → serialized Match
//! user:sockets   hash   user-id    → connection-id
//! socket:users   hash   conn-id    → user-id
//! user:matches   hash   user-id    → match-id
//! invite:{m}:{u} string (with TTL) → serialized Invitation
//! ```

/// Hash of match id → serialized match record.
pub const MATCHES: &str = "matches";

/// Hash of user id → live connection id.
pub const USER_SOCKETS: &str = "user:sockets";

/// Hash of connection id → authenticated user id.
pub const SOCKET_USERS: &str = "socket:users";

/// Hash of user id → the match the user currently occupies.
pub const USER_MATCHES: &str = "user:matches";

/// String key holding the invitation of `user_id` to `match_id`.
pub fn invite(match_id: &str, user_id: &str) -> String {
    format!("invite:{match_id}:{user_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invite_key_format() {
        assert_eq!(invite("m-1", "alice"), "invite:m-1:alice");
    }
}
