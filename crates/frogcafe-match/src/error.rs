//! Error types for the match layer.

use frogcafe_protocol::{GameId, PlayerId};
use frogcafe_session::StoreError;

/// Errors that can occur while creating, joining or playing a game.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// The game does not exist.
    #[error("game {0} not found")]
    NotFound(GameId),

    /// A player referenced by the game does not exist.
    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),

    /// The game is in a state that doesn't allow this operation.
    /// For example, joining a game that's already active.
    #[error("invalid game state: {0}")]
    InvalidState(String),

    /// An identifier or argument could not be parsed.
    #[error("bad input: {0}")]
    BadInput(String),

    /// Storage failed; nothing was applied.
    #[error(transparent)]
    Persistence(#[from] StoreError),
}
