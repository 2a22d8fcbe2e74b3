//! Storage seams for sessions and players.
//!
//! The store and the account service only talk to these traits. The
//! in-memory implementations here back the default server and the tests;
//! a database-backed implementation plugs in behind the same traits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use frogcafe_protocol::PlayerId;
use tokio::sync::Mutex;

use crate::{NewPlayer, Player, Session, StoreError};

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Persistent session records, keyed by token.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Stores a new session. `Conflict` if the token is already present.
    async fn insert(&self, session: Session) -> Result<(), StoreError>;

    async fn find(&self, token: &str) -> Result<Option<Session>, StoreError>;

    /// Slides a session's window. A missing token is not an error.
    async fn renew(
        &self,
        token: &str,
        last_activity: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Removes one session. A missing token is not an error.
    async fn delete(&self, token: &str) -> Result<(), StoreError>;

    /// Removes every session of a player and returns how many went.
    async fn delete_for_player(&self, player_id: PlayerId) -> Result<usize, StoreError>;

    /// Removes every session whose `expires_at` is before `now`.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;
}

/// Persistent player accounts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlayerRepository: Send + Sync {
    /// Creates a player and assigns its id. `Conflict` if the username or
    /// email is taken.
    async fn insert(&self, player: NewPlayer) -> Result<Player, StoreError>;

    async fn find(&self, id: PlayerId) -> Result<Option<Player>, StoreError>;

    /// Looks a player up by username together with their password hash.
    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<(Player, String)>, StoreError>;

    /// All players, ordered by id.
    async fn list(&self) -> Result<Vec<Player>, StoreError>;
}

// ---------------------------------------------------------------------------
// In-memory implementations
// ---------------------------------------------------------------------------

/// [`SessionRepository`] over a `HashMap`.
#[derive(Debug, Default)]
pub struct InMemorySessionRepository {
    sessions: Mutex<HashMap<String, Session>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, expired or not.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn insert(&self, session: Session) -> Result<(), StoreError> {
        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(&session.token) {
            return Err(StoreError::Conflict("session token already exists".into()));
        }
        sessions.insert(session.token.clone(), session);
        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.lock().await.get(token).cloned())
    }

    async fn renew(
        &self,
        token: &str,
        last_activity: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if let Some(session) = self.sessions.lock().await.get_mut(token) {
            session.last_activity = last_activity;
            session.expires_at = expires_at;
        }
        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<(), StoreError> {
        self.sessions.lock().await.remove(token);
        Ok(())
    }

    async fn delete_for_player(&self, player_id: PlayerId) -> Result<usize, StoreError> {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.player_id != player_id);
        Ok(before - sessions.len())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        Ok(before - sessions.len())
    }
}

struct PlayerRow {
    player: Player,
    password_hash: String,
}

/// [`PlayerRepository`] over a `HashMap`, with ids handed out from a
/// counter starting at 1.
#[derive(Default)]
pub struct InMemoryPlayerRepository {
    rows: Mutex<HashMap<PlayerId, PlayerRow>>,
    next_id: AtomicU64,
}

impl InMemoryPlayerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites a player's rating and reports whether the player
    /// exists. Ratings are maintained outside this crate; this lets
    /// callers and tests seed them.
    pub async fn set_rating(&self, id: PlayerId, rating: i32) -> bool {
        let mut rows = self.rows.lock().await;
        let Some(row) = rows.get_mut(&id) else {
            return false;
        };
        row.player.rating = rating;
        row.player.updated_at = Utc::now();
        true
    }
}

#[async_trait]
impl PlayerRepository for InMemoryPlayerRepository {
    async fn insert(&self, new: NewPlayer) -> Result<Player, StoreError> {
        let mut rows = self.rows.lock().await;
        let taken = rows.values().any(|row| {
            row.player.username == new.username
                || (!new.email.is_empty() && row.player.email == new.email)
        });
        if taken {
            return Err(StoreError::Conflict("username or email already exists".into()));
        }

        let id = PlayerId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let now = Utc::now();
        let player = Player {
            id,
            username: new.username,
            email: new.email,
            rating: new.rating,
            created_at: now,
            updated_at: now,
        };
        rows.insert(
            id,
            PlayerRow {
                player: player.clone(),
                password_hash: new.password_hash,
            },
        );
        Ok(player)
    }

    async fn find(&self, id: PlayerId) -> Result<Option<Player>, StoreError> {
        Ok(self.rows.lock().await.get(&id).map(|row| row.player.clone()))
    }

    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<(Player, String)>, StoreError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .values()
            .find(|row| row.player.username == username)
            .map(|row| (row.player.clone(), row.password_hash.clone())))
    }

    async fn list(&self) -> Result<Vec<Player>, StoreError> {
        let rows = self.rows.lock().await;
        let mut players: Vec<Player> = rows.values().map(|row| row.player.clone()).collect();
        players.sort_by_key(|p| p.id);
        Ok(players)
    }
}
