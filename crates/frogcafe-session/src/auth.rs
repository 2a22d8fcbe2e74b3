//! Authentication hook for live connections.
//!
//! The connection pump never looks at the session store directly; it
//! asks an [`Authenticator`] to turn a bearer token into an identity.
//! [`SessionStore`](crate::SessionStore) is the production implementation,
//! and tests can plug in anything that maps tokens to players.
//!
//! The trait goes through `async-trait` so it can sit behind
//! `Arc<dyn Authenticator>` inside spawned connection tasks.

use async_trait::async_trait;
use frogcafe_protocol::PlayerId;

use crate::SessionError;

/// Who a valid token belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedPlayer {
    pub player_id: PlayerId,
    pub username: String,
}

/// Validates a client's token and returns their identity.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use frogcafe_protocol::PlayerId;
/// use frogcafe_session::{AuthenticatedPlayer, Authenticator, SessionError};
///
/// /// Accepts numeric tokens as player ids. Development only.
/// struct DevAuthenticator;
///
/// #[async_trait]
/// impl Authenticator for DevAuthenticator {
///     async fn authenticate(
///         &self,
///         token: &str,
///     ) -> Result<AuthenticatedPlayer, SessionError> {
///         let id: u64 = token.parse().map_err(|_| SessionError::InvalidSession)?;
///         Ok(AuthenticatedPlayer {
///             player_id: PlayerId(id),
///             username: format!("dev-{id}"),
///         })
///     }
/// }
/// ```
#[async_trait]
pub trait Authenticator: Send + Sync + 'static {
    /// Returns the player behind `token`.
    ///
    /// # Errors
    /// - [`SessionError::InvalidSession`] if the token is unknown
    /// - [`SessionError::SessionExpired`] if it was valid once but no
    ///   longer is
    async fn authenticate(&self, token: &str) -> Result<AuthenticatedPlayer, SessionError>;
}
