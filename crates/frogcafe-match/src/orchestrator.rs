//! Match orchestrator: creates games, seats the second player, ends games.
//!
//! ## Lifecycle
//!
//! ```text
//! create_game ──► Waiting ──join_game──► Active ──finish_game──► Finished
//!                                 │                     │
//!                                 └──► game_update ◄────┘
//! ```
//!
//! Joining reads both players' ratings, picks colors with
//! [`assign_colors`], and commits seats and status in one conditional
//! repository call. If another joiner got there first the condition
//! fails and this join reports `InvalidState`.

use std::sync::Arc;

use frogcafe_protocol::{Game, GameId, GameStatus, PlayerId};
use frogcafe_session::PlayerRepository;

use crate::{assign_colors, GameNotifier, GameRepository, MatchConfig, MatchError};

/// Game lifecycle operations for the request layer.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct MatchOrchestrator {
    games: Arc<dyn GameRepository>,
    players: Arc<dyn PlayerRepository>,
    notifier: Option<Arc<dyn GameNotifier>>,
    config: MatchConfig,
}

impl MatchOrchestrator {
    /// An orchestrator with no notifier attached: state changes are
    /// committed but not broadcast.
    pub fn new(
        games: Arc<dyn GameRepository>,
        players: Arc<dyn PlayerRepository>,
        config: MatchConfig,
    ) -> Self {
        Self {
            games,
            players,
            notifier: None,
            config,
        }
    }

    /// Attaches the notifier that hears about every committed change.
    pub fn with_notifier(mut self, notifier: Arc<dyn GameNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Opens a new game for `creator_id`. A missing or zero board size
    /// falls back to `config.default_board_size`.
    pub async fn create_game(
        &self,
        creator_id: PlayerId,
        board_size: Option<u32>,
    ) -> Result<Game, MatchError> {
        let board_size = self.config.board_size(board_size);
        let game = self.games.insert(creator_id, board_size).await?;
        tracing::info!(game_id = %game.id, %creator_id, board_size, "game created");
        Ok(game)
    }

    /// Seats `joiner_id` opposite the creator and starts the game.
    ///
    /// # Errors
    /// - [`MatchError::NotFound`] if the game doesn't exist
    /// - [`MatchError::InvalidState`] if it isn't waiting, the joiner is
    ///   the creator, a seat is already taken, or another join won the
    ///   race
    /// - [`MatchError::PlayerNotFound`] if either player has no account
    pub async fn join_game(
        &self,
        joiner_id: PlayerId,
        game_id: GameId,
    ) -> Result<Game, MatchError> {
        let game = self
            .games
            .find(game_id)
            .await?
            .ok_or(MatchError::NotFound(game_id))?;

        if !game.status.is_joinable() {
            return Err(MatchError::InvalidState(format!(
                "game {game_id} is {}, not waiting",
                game.status
            )));
        }
        if joiner_id == game.creator_id {
            return Err(MatchError::InvalidState(
                "cannot join your own game".into(),
            ));
        }
        if game.black_player_id.is_some() || game.white_player_id.is_some() {
            return Err(MatchError::InvalidState(format!(
                "game {game_id} already has a seated player"
            )));
        }

        let creator_rating = self.rating(game.creator_id).await?;
        let joiner_rating = self.rating(joiner_id).await?;
        let seating = assign_colors(
            game_id,
            (game.creator_id, creator_rating),
            (joiner_id, joiner_rating),
            self.config.rating_margin,
        );

        let game = self
            .games
            .activate(game_id, seating.black, seating.white)
            .await?
            .ok_or_else(|| {
                MatchError::InvalidState(format!("game {game_id} was joined by someone else"))
            })?;

        tracing::info!(
            %game_id,
            black = %seating.black,
            white = %seating.white,
            "game started"
        );
        self.notify(&game).await;
        Ok(game)
    }

    /// Ends an active game, optionally naming a winner.
    ///
    /// # Errors
    /// - [`MatchError::NotFound`] if the game doesn't exist
    /// - [`MatchError::InvalidState`] if it isn't active or the winner
    ///   isn't one of its players
    pub async fn finish_game(
        &self,
        game_id: GameId,
        winner_id: Option<PlayerId>,
    ) -> Result<Game, MatchError> {
        let game = self
            .games
            .find(game_id)
            .await?
            .ok_or(MatchError::NotFound(game_id))?;

        if !game.status.can_transition_to(GameStatus::Finished) {
            return Err(MatchError::InvalidState(format!(
                "game {game_id} is {}, not active",
                game.status
            )));
        }
        if let Some(winner) = winner_id.filter(|w| !game.is_seated(*w)) {
            return Err(MatchError::InvalidState(format!(
                "player {winner} is not seated in game {game_id}"
            )));
        }

        let game = self
            .games
            .finish(game_id, winner_id)
            .await?
            .ok_or_else(|| {
                MatchError::InvalidState(format!("game {game_id} already finished"))
            })?;

        tracing::info!(%game_id, winner = ?winner_id, "game finished");
        self.notify(&game).await;
        Ok(game)
    }

    pub async fn game(&self, game_id: GameId) -> Result<Game, MatchError> {
        self.games
            .find(game_id)
            .await?
            .ok_or(MatchError::NotFound(game_id))
    }

    /// Games filtered by status, newest first.
    pub async fn list_games(&self, status: Option<GameStatus>) -> Result<Vec<Game>, MatchError> {
        Ok(self.games.list(status).await?)
    }

    async fn rating(&self, player_id: PlayerId) -> Result<i32, MatchError> {
        self.players
            .find(player_id)
            .await?
            .map(|p| p.rating)
            .ok_or(MatchError::PlayerNotFound(player_id))
    }

    async fn notify(&self, game: &Game) {
        match &self.notifier {
            Some(notifier) => notifier.game_updated(game).await,
            None => tracing::debug!(game_id = %game.id, "no notifier attached, skipping broadcast"),
        }
    }
}

// ---------------------------------------------------------------------------
// Path parameter parsing
// ---------------------------------------------------------------------------

/// Parses a game id from a path segment or query value.
pub fn parse_game_id(raw: &str) -> Result<GameId, MatchError> {
    raw.parse()
        .map_err(|e: frogcafe_protocol::ProtocolError| MatchError::BadInput(e.to_string()))
}

/// Parses a player id from a path segment or query value.
pub fn parse_player_id(raw: &str) -> Result<PlayerId, MatchError> {
    raw.parse()
        .map_err(|e: frogcafe_protocol::ProtocolError| MatchError::BadInput(e.to_string()))
}
