//! Lobby server demo.
//!
//! Reads `MATCH_*` settings from the environment, authenticates clients
//! against a fixed token table, and keeps everything in an in-process
//! store.
//!
//! ```text
//! MATCH_TRANSPORT=websocket MATCH_PORT=8080 RUST_LOG=debug cargo run -p lobby-server
//! ```
//!
//! Tokens come from `MATCH_DEMO_TOKENS` as `token=user` pairs separated by
//! commas. Without it, `alice-token`, `bob-token`, and `carol-token` are
//! accepted.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use matchforge::prelude::*;
use tracing_subscriber::EnvFilter;

const JANITOR_INTERVAL: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// Maps known tokens to users. Anything else is rejected.
struct StaticTokens {
    tokens: HashMap<String, UserId>,
}

impl StaticTokens {
    fn demo() -> Self {
        let tokens = ["alice", "bob", "carol"]
            .into_iter()
            .map(|user| (format!("{user}-token"), UserId::new(user)))
            .collect();
        Self { tokens }
    }

    /// Parses `token=user,token=user`.
    fn parse(spec: &str) -> Result<Self> {
        let mut tokens = HashMap::new();
        for pair in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (token, user) = pair
                .split_once('=')
                .with_context(|| format!("expected token=user, got {pair:?}"))?;
            let (token, user) = (token.trim(), user.trim());
            anyhow::ensure!(
                !token.is_empty() && !user.is_empty(),
                "empty token or user in {pair:?}"
            );
            tokens.insert(token.to_string(), UserId::new(user));
        }
        anyhow::ensure!(!tokens.is_empty(), "MATCH_DEMO_TOKENS has no entries");
        Ok(Self { tokens })
    }

    fn from_env() -> Result<Self> {
        match std::env::var("MATCH_DEMO_TOKENS") {
            Ok(spec) => Self::parse(&spec).context("invalid MATCH_DEMO_TOKENS"),
            Err(_) => Ok(Self::demo()),
        }
    }
}

impl Authenticator for StaticTokens {
    async fn authenticate(&self, token: &str) -> Result<UserId, SessionError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| SessionError::AuthFailed("unknown token".into()))
    }
}

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

/// Drops expired invitations so an idle lobby doesn't accumulate them.
fn spawn_janitor(store: Arc<MemoryStore>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(JANITOR_INTERVAL);
        loop {
            ticker.tick().await;
            let purged = store.purge_expired().await;
            if purged > 0 {
                tracing::debug!(purged, "expired keys removed");
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let auth = StaticTokens::from_env()?;
    let store = Arc::new(MemoryStore::new());
    spawn_janitor(Arc::clone(&store));

    tracing::info!(
        addr = %config.bind_addr,
        transport = %config.transport,
        users = auth.tokens.len(),
        "starting lobby server"
    );

    let builder = MatchforgeServerBuilder::new().config(config.clone());
    match config.transport {
        TransportKind::WebSocket => builder.build(store, auth).await?.run().await?,
        TransportKind::Tcp => builder.build_tcp(store, auth).await?.run().await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token_table() {
        let auth = StaticTokens::parse("t1=alice, t2 = bob").unwrap();
        assert_eq!(auth.tokens.len(), 2);
        assert_eq!(auth.tokens["t2"], UserId::new("bob"));
    }

    #[test]
    fn test_parse_rejects_malformed_pairs() {
        assert!(StaticTokens::parse("no-equals-sign").is_err());
        assert!(StaticTokens::parse("=alice").is_err());
        assert!(StaticTokens::parse(" , ").is_err());
    }

    #[tokio::test]
    async fn test_authenticate_known_and_unknown_tokens() {
        let auth = StaticTokens::demo();
        assert_eq!(
            auth.authenticate("bob-token").await.unwrap(),
            UserId::new("bob")
        );
        assert!(matches!(
            auth.authenticate("bob").await,
            Err(SessionError::AuthFailed(_))
        ));
    }
}
