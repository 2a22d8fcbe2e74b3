//! `FrogcafeServer` builder and server loop.
//!
//! This is the entry point for running a Frogcafe server. It ties
//! together all the layers: transport → hub → session → match.

use std::future::Future;
use std::sync::Arc;

use frogcafe_match::{
    GameRepository, InMemoryGameRepository, InMemoryMoveRepository, MatchOrchestrator,
    MoveLedger, MoveRepository,
};
use frogcafe_session::{
    Accounts, Clock, InMemoryPlayerRepository, InMemorySessionRepository, PasswordHasher,
    PlayerRepository, SessionConfig, SessionRepository, SessionStore, SystemClock,
};
use frogcafe_transport::{Transport, WebSocketTransport};
use tokio::task::JoinHandle;

use crate::connection::{serve_connection, ConnectionContext};
use crate::hub::{Hub, HubHandle};
use crate::{FrogcafeError, ServerConfig};

/// The operations a request layer calls into, already wired together.
///
/// Cheap to clone: every member is a handle onto shared state.
#[derive(Clone)]
pub struct Services {
    pub sessions: SessionStore,
    pub accounts: Accounts,
    /// Announces every committed game change through `hub`.
    pub matches: MatchOrchestrator,
    pub ledger: MoveLedger,
    pub hub: HubHandle,
}

/// Builder for configuring and starting a Frogcafe server.
///
/// Repositories default to the in-memory implementations; swap any of
/// them for a persistent one before calling [`build`](Self::build).
///
/// # Example
///
/// ```rust,no_run
/// use frogcafe::prelude::*;
///
/// # async fn start() -> Result<(), FrogcafeError> {
/// let server = FrogcafeServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct FrogcafeServerBuilder {
    config: ServerConfig,
    players: Option<Arc<dyn PlayerRepository>>,
    sessions: Option<Arc<dyn SessionRepository>>,
    games: Option<Arc<dyn GameRepository>>,
    moves: Option<Arc<dyn MoveRepository>>,
    clock: Option<Arc<dyn Clock>>,
}

impl FrogcafeServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            players: None,
            sessions: None,
            games: None,
            moves: None,
            clock: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind = addr.to_string();
        self
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    pub fn idle_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config.idle_timeout = Some(timeout);
        self
    }

    pub fn password_cost(mut self, cost: u32) -> Self {
        self.config.password_cost = cost;
        self
    }

    pub fn players(mut self, repo: Arc<dyn PlayerRepository>) -> Self {
        self.players = Some(repo);
        self
    }

    pub fn sessions(mut self, repo: Arc<dyn SessionRepository>) -> Self {
        self.sessions = Some(repo);
        self
    }

    pub fn games(mut self, repo: Arc<dyn GameRepository>) -> Self {
        self.games = Some(repo);
        self
    }

    pub fn moves(mut self, repo: Arc<dyn MoveRepository>) -> Self {
        self.moves = Some(repo);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Binds the listener, starts the hub, and wires the services.
    ///
    /// # Errors
    /// [`FrogcafeError::Transport`] if the address can't be bound.
    pub async fn build(self) -> Result<FrogcafeServer, FrogcafeError> {
        let config = self.config;
        let transport = WebSocketTransport::bind(&config.bind).await?;

        let players = self
            .players
            .unwrap_or_else(|| Arc::new(InMemoryPlayerRepository::new()));
        let session_repo = self
            .sessions
            .unwrap_or_else(|| Arc::new(InMemorySessionRepository::new()));
        let games = self
            .games
            .unwrap_or_else(|| Arc::new(InMemoryGameRepository::new()));
        let moves = self
            .moves
            .unwrap_or_else(|| Arc::new(InMemoryMoveRepository::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let (hub, hub_task) = Hub::spawn(config.hub.clone());

        let sessions = SessionStore::new(
            session_repo,
            Arc::clone(&players),
            clock,
            config.session.clone(),
        );
        let accounts = Accounts::new(
            Arc::clone(&players),
            sessions.clone(),
            PasswordHasher::with_cost(config.password_cost),
        );
        let ledger = MoveLedger::new(Arc::clone(&games), moves);
        let matches = MatchOrchestrator::new(games, players, config.matches.clone())
            .with_notifier(Arc::new(hub.clone()));

        let ctx = Arc::new(ConnectionContext {
            hub: hub.clone(),
            auth: Arc::new(sessions.clone()),
            ledger: ledger.clone(),
            idle_timeout: config.idle_timeout,
        });

        let services = Services {
            sessions,
            accounts,
            matches,
            ledger,
            hub,
        };

        Ok(FrogcafeServer {
            transport,
            services,
            ctx,
            hub_task,
        })
    }
}

impl Default for FrogcafeServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Frogcafe server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct FrogcafeServer {
    transport: WebSocketTransport,
    services: Services,
    ctx: Arc<ConnectionContext>,
    hub_task: JoinHandle<()>,
}

impl FrogcafeServer {
    /// Creates a new builder.
    pub fn builder() -> FrogcafeServerBuilder {
        FrogcafeServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The wired services, for a request layer or for tests.
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), FrogcafeError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes, then stops the
    /// session sweeper and the hub. Stopping the hub closes every
    /// connection's outbound queue, which ends its task.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), FrogcafeError>
    where
        F: Future<Output = ()>,
    {
        let sweeper = self.services.sessions.spawn_sweeper();
        tracing::info!(addr = ?self.local_addr().ok(), "Frogcafe server running");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let ctx = Arc::clone(&self.ctx);
                        tokio::spawn(async move {
                            if let Err(e) = serve_connection(conn, ctx).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        tracing::info!("Frogcafe server shutting down");
        sweeper.abort();
        self.transport.shutdown().await?;
        // The hub may already be gone if every handle was dropped.
        let _ = self.services.hub.shutdown().await;
        if let Err(e) = self.hub_task.await {
            tracing::warn!(error = %e, "hub task did not stop cleanly");
        }
        Ok(())
    }
}
