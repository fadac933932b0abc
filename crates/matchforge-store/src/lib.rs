//! Shared session store for Matchforge.
//!
//! All cross-connection state (who is online on which connection, who is
//! in which match, match records, pending invitations) lives behind the
//! [`SessionStore`] trait rather than in any one connection handler's
//! memory. The command set mirrors a small subset of a Redis-style
//! key-value server: strings with optional TTL and string hashes.
//!
//! [`MemoryStore`] is the in-process implementation used by the demo
//! server and by tests.
//!
//! ```text
//! Gateway ──┐
//!           ├──→ SessionStore (this crate) ──→ MemoryStore / remote backend
//! Orchestrator
//! ```

pub mod keys;

mod error;
mod memory;

pub use error::StoreError;
pub use memory::MemoryStore;

use std::future::Future;
use std::time::Duration;

/// A shared key-value store with string and hash values.
///
/// Implementations must serialize conflicting writes to the same key;
/// callers never hold a lock across two commands.
///
/// Every method returns `impl Future + Send` so handlers generic over the
/// store can still be spawned onto the multi-threaded runtime.
pub trait SessionStore: Send + Sync + 'static {
    /// Returns the string at `key`, or `None` if absent or expired.
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Stores a string at `key`, replacing any previous value and TTL.
    /// With `ttl = Some(d)` the key disappears `d` after this call.
    fn set(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Atomically reads and deletes the string at `key`.
    ///
    /// Two concurrent callers can never both observe the same value.
    fn take(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Deletes `key` (string or hash). Returns `true` if it existed.
    fn del(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Returns `true` if `key` exists (and has not expired).
    fn exists(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Returns `field` of the hash at `key`.
    fn hget(
        &self,
        key: &str,
        field: &str,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Sets `field` of the hash at `key`, creating the hash if needed.
    fn hset(
        &self,
        key: &str,
        field: &str,
        value: String,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Removes `field` from the hash at `key`. Returns `true` if it existed.
    fn hdel(
        &self,
        key: &str,
        field: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;
}
