//! Authentication hook for verifying a client's credential.
//!
//! Matchforge doesn't issue or verify tokens itself. Whatever does (a JWT
//! library, an identity provider, a static table in a demo) is plugged in
//! through the [`Authenticator`] trait: one async method that takes the
//! opaque credential string and returns the verified subject.
//!
//! Production can validate signed tokens, development can accept a fixed
//! table, and tests can map `"token-alice"` to `alice`, all without
//! touching the gateway.

use std::future::Future;

use matchforge_protocol::UserId;

use crate::SessionError;

/// Verifies a credential and returns the subject it belongs to.
///
/// # Trait bounds
///
/// - `Send + Sync` → one authenticator is shared by every connection task.
/// - `'static` → it lives as long as the server.
///
/// The returned future must be `Send` so connection handlers that await
/// it can run on the multi-threaded runtime.
///
/// # Example
///
/// ```rust
/// use matchforge_protocol::UserId;
/// use matchforge_session::{Authenticator, SessionError};
///
/// /// Accepts `user:<name>` and treats `<name>` as the subject.
/// /// Development only.
/// struct PrefixAuthenticator;
///
/// impl Authenticator for PrefixAuthenticator {
///     async fn authenticate(&self, token: &str) -> Result<UserId, SessionError> {
///         token
///             .strip_prefix("user:")
///             .filter(|name| !name.is_empty())
///             .map(UserId::from)
///             .ok_or_else(|| SessionError::AuthFailed("unknown token".into()))
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Verifies `token`.
    ///
    /// # Returns
    /// - `Ok(UserId)` — the credential is valid for this subject
    /// - `Err(SessionError::AuthFailed)` — invalid, expired, or unknown
    fn authenticate(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<UserId, SessionError>> + Send;
}
