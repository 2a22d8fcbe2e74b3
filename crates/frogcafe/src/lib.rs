//! # Frogcafe
//!
//! Real-time session and broadcast service for an online board game.
//!
//! Players register and log in for an opaque session token, open and
//! join games, and watch them live over WebSocket: moves and game
//! updates fan out to every connection watching the game they belong to.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use frogcafe::prelude::*;
//!
//! # async fn start() -> Result<(), FrogcafeError> {
//! let config = ServerConfig::from_env()?;
//! let server = FrogcafeServer::builder().config(config).build().await?;
//! server.run().await
//! # }
//! ```
//!
//! ## Layers
//!
//! ```text
//! frogcafe            hub, connection pumps, server builder
//!   ├─ frogcafe-match     games, colors, move numbering
//!   ├─ frogcafe-session   tokens, accounts, password hashing
//!   ├─ frogcafe-protocol  wire messages, ids, records
//!   └─ frogcafe-transport WebSocket listener
//! ```

mod config;
mod connection;
mod error;
pub mod hub;
mod server;

pub use config::ServerConfig;
pub use error::{FrogcafeError, HubError};
pub use server::{FrogcafeServer, FrogcafeServerBuilder, Services};

pub mod prelude {
    //! Everything needed to start a server and drive it from a request
    //! layer.

    pub use crate::hub::{Hub, HubConfig, HubHandle, HubStats};
    pub use crate::{
        FrogcafeError, FrogcafeServer, FrogcafeServerBuilder, HubError, ServerConfig, Services,
    };
    pub use frogcafe_match::{
        parse_game_id, parse_player_id, GameNotifier, MatchConfig, MatchError,
        MatchOrchestrator, MoveLedger,
    };
    pub use frogcafe_protocol::{
        Frame, Game, GameId, GameStatus, Move, PlayerId, WireMessage,
    };
    pub use frogcafe_session::{
        Accounts, AuthenticatedPlayer, Authenticator, Player, SessionConfig, SessionError,
        SessionStore,
    };
}
