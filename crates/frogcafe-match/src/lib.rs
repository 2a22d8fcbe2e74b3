//! Games and moves for Frogcafe.
//!
//! - [`MatchOrchestrator`] opens games, seats the second player with a
//!   rating-based color policy, and finishes games. Every committed change
//!   is announced through a [`GameNotifier`].
//! - [`MoveLedger`] records moves and hands out gap-free, per-game move
//!   numbers, even when writers race.
//!
//! # How it fits in the stack
//!
//! ```text
//! Hub / Connections (above)  ← record moves, receive game updates
//!     ↕
//! Match Layer (this crate)
//!     ↕
//! Storage (below)            ← GameRepository, MoveRepository, PlayerRepository
//! ```

mod config;
mod error;
mod ledger;
mod notifier;
mod orchestrator;
mod repository;

pub use config::{assign_colors, MatchConfig, Seating};
pub use error::MatchError;
pub use ledger::MoveLedger;
pub use notifier::GameNotifier;
pub use orchestrator::{parse_game_id, parse_player_id, MatchOrchestrator};
pub use repository::{
    GameRepository, InMemoryGameRepository, InMemoryMoveRepository,
    MoveRepository, NewMove,
};
