//! Storage seams for games and moves.
//!
//! The conditional updates ([`GameRepository::activate`],
//! [`GameRepository::finish`]) and the `(game_id, move_number)`
//! uniqueness rule are part of the contract: a database-backed
//! implementation must enforce them in a single statement.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use frogcafe_protocol::{Game, GameId, GameStatus, Move, PlayerId};
use frogcafe_session::StoreError;
use tokio::sync::Mutex;

/// Input for recording a move. The repository assigns `id` and
/// `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMove {
    pub game_id: GameId,
    pub player_id: PlayerId,
    pub x: i32,
    pub y: i32,
    pub move_number: u32,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GameRepository: Send + Sync {
    /// Creates a waiting game with empty seats.
    async fn insert(&self, creator_id: PlayerId, board_size: u32) -> Result<Game, StoreError>;

    async fn find(&self, id: GameId) -> Result<Option<Game>, StoreError>;

    /// Games with the given status (all when `None`), newest first.
    async fn list(&self, status: Option<GameStatus>) -> Result<Vec<Game>, StoreError>;

    /// Fills both seats and moves the game to `Active`, but only if it is
    /// still waiting with both seats empty. `Ok(None)` when that
    /// condition no longer holds.
    async fn activate(
        &self,
        id: GameId,
        black: PlayerId,
        white: PlayerId,
    ) -> Result<Option<Game>, StoreError>;

    /// Moves an active game to `Finished`. `Ok(None)` if it wasn't active.
    async fn finish(
        &self,
        id: GameId,
        winner: Option<PlayerId>,
    ) -> Result<Option<Game>, StoreError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MoveRepository: Send + Sync {
    /// Highest move number recorded for the game, 0 if none.
    async fn max_move_number(&self, game_id: GameId) -> Result<u32, StoreError>;

    /// Stores a move. `Conflict` if the game already has that number.
    async fn insert(&self, new: NewMove) -> Result<Move, StoreError>;

    /// Every move of the game, by ascending move number.
    async fn list(&self, game_id: GameId) -> Result<Vec<Move>, StoreError>;
}

// ---------------------------------------------------------------------------
// In-memory implementations
// ---------------------------------------------------------------------------

/// [`GameRepository`] over a `HashMap`. Ids start at 1.
#[derive(Debug, Default)]
pub struct InMemoryGameRepository {
    games: Mutex<HashMap<GameId, Game>>,
    next_id: AtomicU64,
}

impl InMemoryGameRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameRepository for InMemoryGameRepository {
    async fn insert(&self, creator_id: PlayerId, board_size: u32) -> Result<Game, StoreError> {
        let id = GameId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let now = Utc::now();
        let game = Game {
            id,
            black_player_id: None,
            white_player_id: None,
            board_size,
            status: GameStatus::Waiting,
            winner_id: None,
            creator_id,
            created_at: now,
            updated_at: now,
        };
        self.games.lock().await.insert(id, game.clone());
        Ok(game)
    }

    async fn find(&self, id: GameId) -> Result<Option<Game>, StoreError> {
        Ok(self.games.lock().await.get(&id).cloned())
    }

    async fn list(&self, status: Option<GameStatus>) -> Result<Vec<Game>, StoreError> {
        let games = self.games.lock().await;
        let mut listed: Vec<Game> = games
            .values()
            .filter(|g| status.is_none_or(|s| g.status == s))
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(listed)
    }

    async fn activate(
        &self,
        id: GameId,
        black: PlayerId,
        white: PlayerId,
    ) -> Result<Option<Game>, StoreError> {
        let mut games = self.games.lock().await;
        let Some(game) = games.get_mut(&id) else {
            return Ok(None);
        };
        if game.status != GameStatus::Waiting
            || game.black_player_id.is_some()
            || game.white_player_id.is_some()
        {
            return Ok(None);
        }
        game.black_player_id = Some(black);
        game.white_player_id = Some(white);
        game.status = GameStatus::Active;
        game.updated_at = Utc::now();
        Ok(Some(game.clone()))
    }

    async fn finish(
        &self,
        id: GameId,
        winner: Option<PlayerId>,
    ) -> Result<Option<Game>, StoreError> {
        let mut games = self.games.lock().await;
        let Some(game) = games.get_mut(&id) else {
            return Ok(None);
        };
        if !game.status.can_transition_to(GameStatus::Finished) {
            return Ok(None);
        }
        game.status = GameStatus::Finished;
        game.winner_id = winner;
        game.updated_at = Utc::now();
        Ok(Some(game.clone()))
    }
}

/// [`MoveRepository`] keeping each game's moves in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryMoveRepository {
    moves: Mutex<HashMap<GameId, Vec<Move>>>,
    next_id: AtomicU64,
}

impl InMemoryMoveRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MoveRepository for InMemoryMoveRepository {
    async fn max_move_number(&self, game_id: GameId) -> Result<u32, StoreError> {
        let moves = self.moves.lock().await;
        Ok(moves
            .get(&game_id)
            .and_then(|list| list.iter().map(|m| m.move_number).max())
            .unwrap_or(0))
    }

    async fn insert(&self, new: NewMove) -> Result<Move, StoreError> {
        let mut moves = self.moves.lock().await;
        let list = moves.entry(new.game_id).or_default();
        if list.iter().any(|m| m.move_number == new.move_number) {
            return Err(StoreError::Conflict(format!(
                "move {} already recorded for game {}",
                new.move_number, new.game_id
            )));
        }
        let mv = Move {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            game_id: new.game_id,
            player_id: new.player_id,
            x: new.x,
            y: new.y,
            move_number: new.move_number,
            created_at: Utc::now(),
        };
        list.push(mv.clone());
        Ok(mv)
    }

    async fn list(&self, game_id: GameId) -> Result<Vec<Move>, StoreError> {
        let moves = self.moves.lock().await;
        let mut list = moves.get(&game_id).cloned().unwrap_or_default();
        list.sort_by_key(|m| m.move_number);
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_move(game: u64, number: u32) -> NewMove {
        NewMove {
            game_id: GameId(game),
            player_id: PlayerId(1),
            x: 0,
            y: 0,
            move_number: number,
        }
    }

    #[tokio::test]
    async fn test_activate_only_once() {
        let repo = InMemoryGameRepository::new();
        let game = repo.insert(PlayerId(1), 19).await.unwrap();

        let active = repo
            .activate(game.id, PlayerId(2), PlayerId(1))
            .await
            .unwrap()
            .expect("first activation wins");
        assert_eq!(active.status, GameStatus::Active);
        assert_eq!(active.black_player_id, Some(PlayerId(2)));

        let second = repo.activate(game.id, PlayerId(3), PlayerId(1)).await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_finish_requires_active() {
        let repo = InMemoryGameRepository::new();
        let game = repo.insert(PlayerId(1), 19).await.unwrap();
        assert!(repo.finish(game.id, None).await.unwrap().is_none());

        repo.activate(game.id, PlayerId(1), PlayerId(2)).await.unwrap();
        let done = repo.finish(game.id, Some(PlayerId(2))).await.unwrap().unwrap();
        assert_eq!(done.status, GameStatus::Finished);
        assert_eq!(done.winner_id, Some(PlayerId(2)));
    }

    #[tokio::test]
    async fn test_list_filters_and_orders_newest_first() {
        let repo = InMemoryGameRepository::new();
        let a = repo.insert(PlayerId(1), 19).await.unwrap();
        let b = repo.insert(PlayerId(1), 9).await.unwrap();
        let c = repo.insert(PlayerId(1), 13).await.unwrap();
        repo.activate(b.id, PlayerId(1), PlayerId(2)).await.unwrap();

        let all: Vec<GameId> = repo.list(None).await.unwrap().iter().map(|g| g.id).collect();
        assert_eq!(all, vec![c.id, b.id, a.id]);

        let waiting: Vec<GameId> = repo
            .list(Some(GameStatus::Waiting))
            .await
            .unwrap()
            .iter()
            .map(|g| g.id)
            .collect();
        assert_eq!(waiting, vec![c.id, a.id]);
    }

    #[tokio::test]
    async fn test_move_insert_duplicate_number_conflicts() {
        let repo = InMemoryMoveRepository::new();
        repo.insert(new_move(1, 1)).await.unwrap();
        repo.insert(new_move(2, 1)).await.unwrap();
        let err = repo.insert(new_move(1, 1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(repo.max_move_number(GameId(1)).await.unwrap(), 1);
        assert_eq!(repo.max_move_number(GameId(3)).await.unwrap(), 0);
    }
}
