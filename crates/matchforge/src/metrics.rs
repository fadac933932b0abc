//! Gateway counters.
//!
//! Plain atomics, readable at any time through [`GatewayMetrics::snapshot`]
//! or a [`ServerHandle`](crate::ServerHandle). `cleanup_failures` is the one
//! operators should alert on: each increment means a closed connection
//! left a registry entry, session mapping, or match seat behind.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters for one server.
#[derive(Debug, Default)]
pub struct GatewayMetrics {
    connections_opened: AtomicU64,
    connections_closed: AtomicU64,
    authentications: AtomicU64,
    auth_failures: AtomicU64,
    messages_handled: AtomicU64,
    frames_dropped: AtomicU64,
    errors_sent: AtomicU64,
    cleanup_failures: AtomicU64,
}

/// A point-in-time copy of [`GatewayMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub connections_opened: u64,
    pub connections_closed: u64,
    pub authentications: u64,
    pub auth_failures: u64,
    pub messages_handled: u64,
    pub frames_dropped: u64,
    pub errors_sent: u64,
    pub cleanup_failures: u64,
}

impl MetricsSnapshot {
    /// Connections opened and not yet cleaned up.
    pub fn connections_live(&self) -> u64 {
        self.connections_opened.saturating_sub(self.connections_closed)
    }
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn authenticated(&self) {
        self.authentications.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn auth_failed(&self) {
        self.auth_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn message_handled(&self) {
        self.messages_handled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn frame_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn error_sent(&self) {
        self.errors_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn cleanup_failed(&self) {
        self.cleanup_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            authentications: self.authentications.load(Ordering::Relaxed),
            auth_failures: self.auth_failures.load(Ordering::Relaxed),
            messages_handled: self.messages_handled.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            errors_sent: self.errors_sent.load(Ordering::Relaxed),
            cleanup_failures: self.cleanup_failures.load(Ordering::Relaxed),
        }
    }
}
