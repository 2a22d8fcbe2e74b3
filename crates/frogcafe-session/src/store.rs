//! The session store: issues, validates and expires bearer tokens.
//!
//! Validity is a sliding window. A token lives for `lifetime` after its
//! last renewal, and any successful validation more than
//! `renewal_grace` after the previous renewal pushes the deadline out
//! again. Expired records are deleted lazily on validation and in bulk
//! by a background sweeper.
//!
//! ```text
//! create ──► valid ──(validate, past grace)──► renewed ──► ...
//!              │
//!              └──(now > expires_at)──► SessionExpired, record deleted
//!                                           │
//!                                           └──► InvalidSession
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use frogcafe_protocol::PlayerId;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::{
    AuthenticatedPlayer, Authenticator, Clock, PlayerRepository, Session,
    SessionConfig, SessionError, SessionRepository,
};

/// Issues and checks session tokens.
///
/// Cheap to clone: every field is shared.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<dyn SessionRepository>,
    players: Arc<dyn PlayerRepository>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
}

impl SessionStore {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        players: Arc<dyn PlayerRepository>,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
    ) -> Self {
        Self {
            sessions,
            players,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Starts a new session for `player_id` and returns its token.
    ///
    /// # Errors
    /// [`SessionError::Persistence`] if the record can't be written.
    pub async fn create(&self, player_id: PlayerId) -> Result<String, SessionError> {
        let token = generate_token();
        let session = Session::new(
            token.clone(),
            player_id,
            self.clock.now(),
            self.config.lifetime_delta(),
        );
        self.sessions.insert(session).await?;

        tracing::info!(%player_id, "session created");
        Ok(token)
    }

    /// Resolves a token to its player, sliding the window if the grace
    /// period has passed.
    ///
    /// A failed renewal write is logged and otherwise ignored: the token
    /// was valid, so the caller still gets the player.
    ///
    /// # Errors
    /// - [`SessionError::InvalidSession`] if the token is unknown or its
    ///   player no longer exists
    /// - [`SessionError::SessionExpired`] if the window has closed; the
    ///   record is removed
    /// - [`SessionError::Persistence`] if the lookup itself fails
    pub async fn validate(&self, token: &str) -> Result<AuthenticatedPlayer, SessionError> {
        let session = self
            .sessions
            .find(token)
            .await?
            .ok_or(SessionError::InvalidSession)?;

        let now = self.clock.now();
        if session.is_expired(now) {
            let player_id = session.player_id;
            if let Err(e) = self.sessions.delete(token).await {
                tracing::warn!(%player_id, error = %e, "failed to delete expired session");
            }
            tracing::debug!(%player_id, "session expired");
            return Err(SessionError::SessionExpired);
        }

        if session.needs_renewal(now, self.config.renewal_grace_delta()) {
            let expires_at = now
                .checked_add_signed(self.config.lifetime_delta())
                .unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC);
            if let Err(e) = self.sessions.renew(token, now, expires_at).await {
                tracing::warn!(
                    player_id = %session.player_id,
                    error = %e,
                    "failed to renew session"
                );
            }
        }

        let player = self
            .players
            .find(session.player_id)
            .await?
            .ok_or(SessionError::InvalidSession)?;

        Ok(AuthenticatedPlayer {
            player_id: player.id,
            username: player.username,
        })
    }

    /// Ends one session. Unknown tokens are fine.
    pub async fn delete(&self, token: &str) -> Result<(), SessionError> {
        self.sessions.delete(token).await?;
        Ok(())
    }

    /// Ends every session of a player.
    pub async fn delete_all(&self, player_id: PlayerId) -> Result<usize, SessionError> {
        let removed = self.sessions.delete_for_player(player_id).await?;
        tracing::info!(%player_id, removed, "all sessions deleted");
        Ok(removed)
    }

    /// Purges every record past its deadline.
    pub async fn sweep_expired(&self) -> Result<usize, SessionError> {
        let removed = self.sessions.delete_expired(self.clock.now()).await?;
        if removed > 0 {
            tracing::info!(removed, "swept expired sessions");
        }
        Ok(removed)
    }

    /// Runs [`sweep_expired`](Self::sweep_expired) every
    /// `config.sweep_interval` until the returned task is aborted. The
    /// first sweep happens one interval after the call.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(store.config.sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = store.sweep_expired().await {
                    tracing::warn!(error = %e, "session sweep failed");
                }
            }
        })
    }
}

#[async_trait]
impl Authenticator for SessionStore {
    async fn authenticate(&self, token: &str) -> Result<AuthenticatedPlayer, SessionError> {
        self.validate(token).await
    }
}

/// 32 bytes from the thread-local CSPRNG, as 64 lowercase hex chars.
fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// =========================================================================
// Tests
// =========================================================================
