//! Player accounts: registration, login and logout.
//!
//! Passwords are hashed with bcrypt. Hashing is deliberately slow, so it
//! runs on Tokio's blocking pool instead of stalling a worker thread that
//! is also driving WebSocket pumps.

use std::sync::Arc;

use frogcafe_protocol::PlayerId;

use crate::{
    NewPlayer, Player, PlayerRepository, SessionError, SessionStore,
    StoreError, DEFAULT_RATING,
};

// ---------------------------------------------------------------------------
// PasswordHasher
// ---------------------------------------------------------------------------

/// bcrypt with a fixed cost factor.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl PasswordHasher {
    /// A hasher with a custom cost (bcrypt accepts 4..=31). Low costs are
    /// only sensible in tests.
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }

    pub async fn hash(&self, password: &str) -> Result<String, SessionError> {
        let password = password.to_string();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| SessionError::Hashing(e.to_string()))?
            .map_err(|e| SessionError::Hashing(e.to_string()))
    }

    /// Checks `password` against a stored hash using bcrypt's own
    /// comparison.
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, SessionError> {
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| SessionError::Hashing(e.to_string()))?
            .map_err(|e| SessionError::Hashing(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// Account operations for the request layer.
#[derive(Clone)]
pub struct Accounts {
    players: Arc<dyn PlayerRepository>,
    sessions: SessionStore,
    hasher: PasswordHasher,
}

impl Accounts {
    pub fn new(
        players: Arc<dyn PlayerRepository>,
        sessions: SessionStore,
        hasher: PasswordHasher,
    ) -> Self {
        Self {
            players,
            sessions,
            hasher,
        }
    }

    /// Creates an account and logs it in.
    ///
    /// # Errors
    /// - [`SessionError::BadInput`] if username or password is empty
    /// - [`SessionError::Conflict`] if the username or email is taken
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(Player, String), SessionError> {
        require_credentials(username, password)?;

        let password_hash = self.hasher.hash(password).await?;
        let player = self
            .players
            .insert(NewPlayer {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
                rating: DEFAULT_RATING,
            })
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => {
                    SessionError::Conflict("username or email already exists".into())
                }
                other => SessionError::Persistence(other),
            })?;

        let token = self.sessions.create(player.id).await?;
        tracing::info!(player_id = %player.id, username = %player.username, "player registered");
        Ok((player, token))
    }

    /// Checks credentials and starts a session.
    ///
    /// # Errors
    /// - [`SessionError::BadInput`] if username or password is empty
    /// - [`SessionError::InvalidCredentials`] for an unknown user or a
    ///   wrong password alike
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(Player, String), SessionError> {
        require_credentials(username, password)?;

        let (player, hash) = self
            .players
            .find_credentials(username)
            .await?
            .ok_or(SessionError::InvalidCredentials)?;

        if !self.hasher.verify(password, &hash).await? {
            tracing::debug!(player_id = %player.id, "wrong password");
            return Err(SessionError::InvalidCredentials);
        }

        let token = self.sessions.create(player.id).await?;
        tracing::info!(player_id = %player.id, "player logged in");
        Ok((player, token))
    }

    /// Ends the session behind `token`. Unknown tokens are fine.
    pub async fn logout(&self, token: &str) -> Result<(), SessionError> {
        if token.is_empty() {
            return Err(SessionError::InvalidSession);
        }
        self.sessions.delete(token).await
    }

    pub async fn player(&self, id: PlayerId) -> Result<Player, SessionError> {
        self.players
            .find(id)
            .await?
            .ok_or(SessionError::PlayerNotFound(id))
    }

    pub async fn players(&self) -> Result<Vec<Player>, SessionError> {
        Ok(self.players.list().await?)
    }
}

fn require_credentials(username: &str, password: &str) -> Result<(), SessionError> {
    if username.is_empty() || password.is_empty() {
        return Err(SessionError::BadInput(
            "username and password are required".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockPlayerRepository;
    use crate::{
        InMemoryPlayerRepository, InMemorySessionRepository, ManualClock,
        SessionConfig,
    };

    fn accounts_with(players: Arc<dyn PlayerRepository>) -> Accounts {
        let store = SessionStore::new(
            Arc::new(InMemorySessionRepository::new()),
            players.clone(),
            Arc::new(ManualClock::default()),
            SessionConfig::default(),
        );
        Accounts::new(players, store, PasswordHasher::with_cost(4))
    }

    fn accounts() -> Accounts {
        accounts_with(Arc::new(InMemoryPlayerRepository::new()))
    }

    #[tokio::test]
    async fn test_password_hasher_verify_round_trip() {
        let hasher = PasswordHasher::with_cost(4);
        let hash = hasher.hash("hunter2").await.unwrap();
        assert_ne!(hash, "hunter2");
        assert!(hasher.verify("hunter2", &hash).await.unwrap());
        assert!(!hasher.verify("hunter3", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_register_returns_player_with_default_rating() {
        let accounts = accounts();
        let (player, token) = accounts
            .register("ann", "ann@example.com", "pw")
            .await
            .unwrap();
        assert_eq!(player.rating, DEFAULT_RATING);
        assert_eq!(token.len(), 64);
        assert_eq!(accounts.player(player.id).await.unwrap(), player);
    }

    #[tokio::test]
    async fn test_register_empty_fields_is_bad_input() {
        let accounts = accounts();
        assert!(matches!(
            accounts.register("", "e", "pw").await,
            Err(SessionError::BadInput(_))
        ));
        assert!(matches!(
            accounts.register("ann", "e", "").await,
            Err(SessionError::BadInput(_))
        ));
    }

    #[tokio::test]
    async fn test_register_duplicate_username_conflicts() {
        let accounts = accounts();
        accounts.register("ann", "a@x", "pw").await.unwrap();
        assert!(matches!(
            accounts.register("ann", "b@x", "pw").await,
            Err(SessionError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_login_wrong_password_and_unknown_user_look_alike() {
        let accounts = accounts();
        accounts.register("ann", "a@x", "pw").await.unwrap();

        let wrong = accounts.login("ann", "nope").await.unwrap_err();
        let unknown = accounts.login("bob", "pw").await.unwrap_err();
        assert!(matches!(wrong, SessionError::InvalidCredentials));
        assert!(matches!(unknown, SessionError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn test_login_then_logout_invalidates_token() {
        let players = Arc::new(InMemoryPlayerRepository::new());
        let store = SessionStore::new(
            Arc::new(InMemorySessionRepository::new()),
            players.clone(),
            Arc::new(ManualClock::default()),
            SessionConfig::default(),
        );
        let accounts = Accounts::new(players, store.clone(), PasswordHasher::with_cost(4));

        accounts.register("ann", "a@x", "pw").await.unwrap();
        let (_, token) = accounts.login("ann", "pw").await.unwrap();
        assert!(store.validate(&token).await.is_ok());

        accounts.logout(&token).await.unwrap();
        accounts.logout(&token).await.unwrap();
        assert!(matches!(
            store.validate(&token).await,
            Err(SessionError::InvalidSession)
        ));
    }

    #[tokio::test]
    async fn test_player_unknown_id_is_not_found() {
        let accounts = accounts();
        assert!(matches!(
            accounts.player(PlayerId(404)).await,
            Err(SessionError::PlayerNotFound(PlayerId(404)))
        ));
    }

    #[tokio::test]
    async fn test_register_storage_failure_is_persistence_error() {
        let mut players = MockPlayerRepository::new();
        players
            .expect_insert()
            .returning(|_| Err(StoreError::Unavailable("down".into())));
        let accounts = accounts_with(Arc::new(players));

        assert!(matches!(
            accounts.register("ann", "a@x", "pw").await,
            Err(SessionError::Persistence(StoreError::Unavailable(_)))
        ));
    }
}
