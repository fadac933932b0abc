//! Server configuration.
//!
//! Defaults suit local development. [`ServerConfig::from_env`] overlays
//! `MATCH_*` environment variables on top of them; a variable that is
//! missing keeps the default, a variable that is present but malformed or
//! out of range is a [`ConfigError`].

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use matchforge_match::MatchConfig;
use matchforge_transport::DEFAULT_MAX_FRAME_LEN;

/// Longest accepted invitation lifetime.
pub const MAX_INVITE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Which wire the server listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// One WebSocket message per protocol frame.
    WebSocket,
    /// Raw TCP with 4-byte big-endian length prefixes.
    Tcp,
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "websocket" | "ws" => Ok(Self::WebSocket),
            "tcp" => Ok(Self::Tcp),
            other => Err(format!("expected websocket or tcp, got {other:?}")),
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WebSocket => f.write_str("websocket"),
            Self::Tcp => f.write_str("tcp"),
        }
    }
}

/// A configuration value that could not be parsed.
#[derive(Debug, thiserror::Error)]
#[error("invalid {var}={value:?}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Gateway settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `ip:port` to listen on.
    pub bind_addr: String,

    /// Wire protocol. Read by whoever picks between
    /// [`build`](crate::MatchforgeServerBuilder::build) and
    /// [`build_tcp`](crate::MatchforgeServerBuilder::build_tcp).
    pub transport: TransportKind,

    /// A connection that sends nothing for this long is closed.
    pub idle_timeout: Duration,

    /// Largest accepted frame on the TCP transport.
    pub max_frame_len: usize,

    /// How long an invitation stays answerable.
    pub invite_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            transport: TransportKind::WebSocket,
            idle_timeout: Duration::from_secs(300),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            invite_ttl: MatchConfig::default().invite_ttl,
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    ///
    /// | Variable | Meaning | Default |
    /// |---|---|---|
    /// | `MATCH_BIND_ADDR` | full `ip:port` | `127.0.0.1:8080` |
    /// | `MATCH_PORT` | port on `0.0.0.0`, if no bind addr | — |
    /// | `MATCH_TRANSPORT` | `websocket` or `tcp` | `websocket` |
    /// | `MATCH_IDLE_TIMEOUT_SECS` | idle timeout, at least 1 | `300` |
    /// | `MATCH_MAX_FRAME_LEN` | TCP frame limit, bytes, at least 1 | `65536` |
    /// | `MATCH_INVITE_TTL_SECS` | invitation lifetime, 1 to 86400 | `300` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env) but reads variables through
    /// `lookup`, so tests don't have to mutate the process environment.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(addr) = lookup("MATCH_BIND_ADDR") {
            config.bind_addr = addr;
        } else if let Some(port) = parse::<u16>(&lookup, "MATCH_PORT")? {
            config.bind_addr = format!("0.0.0.0:{port}");
        }
        if let Some(kind) = parse::<TransportKind>(&lookup, "MATCH_TRANSPORT")? {
            config.transport = kind;
        }
        if let Some(timeout) = parse_secs(&lookup, "MATCH_IDLE_TIMEOUT_SECS", u64::MAX)? {
            config.idle_timeout = timeout;
        }
        if let Some(len) = parse::<usize>(&lookup, "MATCH_MAX_FRAME_LEN")? {
            if len == 0 {
                return Err(ConfigError {
                    var: "MATCH_MAX_FRAME_LEN",
                    value: len.to_string(),
                    reason: "must be at least 1".into(),
                });
            }
            config.max_frame_len = len;
        }
        let max_ttl = MAX_INVITE_TTL.as_secs();
        if let Some(ttl) = parse_secs(&lookup, "MATCH_INVITE_TTL_SECS", max_ttl)? {
            config.invite_ttl = ttl;
        }

        Ok(config)
    }

    /// The orchestrator settings derived from this config.
    pub fn match_config(&self) -> MatchConfig {
        MatchConfig::default().with_invite_ttl(self.invite_ttl)
    }
}

fn parse<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let Some(value) = lookup(var) else {
        return Ok(None);
    };
    let parsed = value.trim().parse::<T>();
    match parsed {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => Err(ConfigError {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}

/// Whole seconds in `1..=max`.
fn parse_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    max: u64,
) -> Result<Option<Duration>, ConfigError> {
    let Some(secs) = parse::<u64>(lookup, var)? else {
        return Ok(None);
    };
    if !(1..=max).contains(&secs) {
        return Err(ConfigError {
            var,
            value: secs.to_string(),
            reason: format!("expected 1..={max} seconds"),
        });
    }
    Ok(Some(Duration::from_secs(secs)))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_vars(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn test_from_lookup_empty_uses_defaults() {
        let config = from_vars(&[]).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.transport, TransportKind::WebSocket);
        assert_eq!(config.idle_timeout, Duration::from_secs(300));
        assert_eq!(config.max_frame_len, 64 * 1024);
        assert_eq!(config.invite_ttl, Duration::from_secs(300));
    }

    #[test]
    fn test_from_lookup_overrides_every_field() {
        let config = from_vars(&[
            ("MATCH_BIND_ADDR", "10.0.0.1:9000"),
            ("MATCH_TRANSPORT", "TCP"),
            ("MATCH_IDLE_TIMEOUT_SECS", "30"),
            ("MATCH_MAX_FRAME_LEN", "1024"),
            ("MATCH_INVITE_TTL_SECS", "60"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr, "10.0.0.1:9000");
        assert_eq!(config.transport, TransportKind::Tcp);
        assert_eq!(config.idle_timeout, Duration::from_secs(30));
        assert_eq!(config.max_frame_len, 1024);
        assert_eq!(config.match_config().invite_ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_from_lookup_port_only_binds_all_interfaces() {
        let config = from_vars(&[("MATCH_PORT", "7000")]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:7000");
    }

    #[test]
    fn test_from_lookup_malformed_value_is_error() {
        let err = from_vars(&[("MATCH_IDLE_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert_eq!(err.var, "MATCH_IDLE_TIMEOUT_SECS");
        assert_eq!(err.value, "soon");

        let err = from_vars(&[("MATCH_TRANSPORT", "carrier-pigeon")]).unwrap_err();
        assert!(err.to_string().contains("MATCH_TRANSPORT"));
    }

    #[test]
    fn test_from_lookup_zero_idle_timeout_is_error() {
        let err = from_vars(&[("MATCH_IDLE_TIMEOUT_SECS", "0")]).unwrap_err();
        assert_eq!(err.var, "MATCH_IDLE_TIMEOUT_SECS");
        assert_eq!(err.value, "0");
    }

    #[test]
    fn test_from_lookup_invite_ttl_out_of_range_is_error() {
        let err = from_vars(&[("MATCH_INVITE_TTL_SECS", "0")]).unwrap_err();
        assert_eq!(err.var, "MATCH_INVITE_TTL_SECS");

        let huge = u64::MAX.to_string();
        let err = from_vars(&[("MATCH_INVITE_TTL_SECS", huge.as_str())]).unwrap_err();
        assert_eq!(err.value, huge);
        assert!(err.to_string().contains("86400"));

        let config = from_vars(&[("MATCH_INVITE_TTL_SECS", "86400")]).unwrap();
        assert_eq!(config.invite_ttl, MAX_INVITE_TTL);
    }

    #[test]
    fn test_from_lookup_zero_frame_len_is_error() {
        let err = from_vars(&[("MATCH_MAX_FRAME_LEN", "0")]).unwrap_err();
        assert_eq!(err.var, "MATCH_MAX_FRAME_LEN");
    }
}
