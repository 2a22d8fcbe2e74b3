//! The move ledger: assigns move numbers and records moves.
//!
//! Numbering is "highest so far + 1", which is a read followed by a
//! write. Two writers for the same game racing through that sequence
//! would both read N and both try to write N+1. The ledger closes the
//! gap in two layers:
//!
//! 1. a per-game async lock serializes read+write inside this process
//! 2. the repository rejects a duplicate `(game_id, move_number)` with
//!    `Conflict`, and the ledger re-reads and retries
//!
//! Moves for different games never wait on each other. A game's lock
//! entry lives only while someone holds or waits on it, so the table
//! stays as small as the number of games with a move in flight.
//!
//! A move must belong to a game that exists. The check runs before a
//! number is handed out, so a move for an unknown game never takes one.

use std::collections::HashMap;
use std::sync::Arc;

use frogcafe_protocol::{GameId, Move, PlayerId};
use frogcafe_session::StoreError;
use tokio::sync::Mutex;

use crate::{GameRepository, MatchError, MoveRepository, NewMove};

/// How many times a numbering conflict is retried before giving up.
const MAX_ATTEMPTS: usize = 3;

/// Records moves with gap-free, per-game move numbers.
///
/// Cheap to clone: clones share the repositories and the lock table.
#[derive(Clone)]
pub struct MoveLedger {
    games: Arc<dyn GameRepository>,
    moves: Arc<dyn MoveRepository>,
    locks: Arc<Mutex<HashMap<GameId, Arc<Mutex<()>>>>>,
}

impl MoveLedger {
    pub fn new(games: Arc<dyn GameRepository>, moves: Arc<dyn MoveRepository>) -> Self {
        Self {
            games,
            moves,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Records a move and returns the number it was given.
    ///
    /// # Errors
    /// - [`MatchError::NotFound`] if the game doesn't exist.
    /// - [`MatchError::Persistence`] if storage fails or the number keeps
    ///   colliding.
    ///
    /// Nothing is recorded in either case.
    pub async fn record_move(
        &self,
        game_id: GameId,
        player_id: PlayerId,
        x: i32,
        y: i32,
    ) -> Result<u32, MatchError> {
        if self.games.find(game_id).await?.is_none() {
            return Err(MatchError::NotFound(game_id));
        }

        let lock = self.lock_for(game_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.number_and_insert(game_id, player_id, x, y).await
        };
        self.release(game_id, lock).await;
        result
    }

    /// Every move of a game, in play order.
    pub async fn moves(&self, game_id: GameId) -> Result<Vec<Move>, MatchError> {
        Ok(self.moves.list(game_id).await?)
    }

    /// Reads the highest number and inserts the next one, retrying on a
    /// conflict. Runs under the game's lock.
    async fn number_and_insert(
        &self,
        game_id: GameId,
        player_id: PlayerId,
        x: i32,
        y: i32,
    ) -> Result<u32, MatchError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let move_number = self.moves.max_move_number(game_id).await? + 1;
            let new = NewMove {
                game_id,
                player_id,
                x,
                y,
                move_number,
            };
            match self.moves.insert(new).await {
                Ok(_) => {
                    tracing::debug!(%game_id, %player_id, move_number, x, y, "move recorded");
                    return Ok(move_number);
                }
                Err(StoreError::Conflict(reason)) if attempt < MAX_ATTEMPTS => {
                    tracing::warn!(%game_id, move_number, %reason, "move number taken, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn lock_for(&self, game_id: GameId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(game_id).or_default().clone()
    }

    /// Drops this caller's handle on a game lock, and the table entry
    /// with it when nobody else holds one.
    ///
    /// New handles are only handed out under the table lock, so a count
    /// of two (the table plus `lock`) can't grow while we look.
    async fn release(&self, game_id: GameId, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&game_id);
        }
    }

    #[cfg(test)]
    async fn tracked_games(&self) -> usize {
        self.locks.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use mockall::Sequence;

    use super::*;
    use crate::repository::MockMoveRepository;
    use crate::{InMemoryGameRepository, InMemoryMoveRepository};

    /// A game repository holding games `1..=n`.
    async fn games(n: usize) -> Arc<dyn GameRepository> {
        let repo = InMemoryGameRepository::new();
        for _ in 0..n {
            repo.insert(PlayerId(1), 19).await.unwrap();
        }
        Arc::new(repo)
    }

    #[tokio::test]
    async fn test_record_move_numbers_start_at_one() {
        let ledger = MoveLedger::new(games(2).await, Arc::new(InMemoryMoveRepository::new()));
        let g = GameId(1);
        assert_eq!(ledger.record_move(g, PlayerId(1), 3, 3).await.unwrap(), 1);
        assert_eq!(ledger.record_move(g, PlayerId(2), 4, 4).await.unwrap(), 2);
        assert_eq!(ledger.record_move(GameId(2), PlayerId(1), 0, 0).await.unwrap(), 1);

        let moves = ledger.moves(g).await.unwrap();
        assert_eq!(moves.len(), 2);
        assert_eq!((moves[1].x, moves[1].y, moves[1].player_id), (4, 4, PlayerId(2)));
    }

    #[tokio::test]
    async fn test_record_move_retries_after_conflict() {
        let mut repo = MockMoveRepository::new();
        let mut seq = Sequence::new();
        repo.expect_max_move_number()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(4));
        repo.expect_insert()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(StoreError::Conflict("taken".into())));
        repo.expect_max_move_number()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(5));
        repo.expect_insert()
            .withf(|new| new.move_number == 6)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|new| {
                Ok(Move {
                    id: 1,
                    game_id: new.game_id,
                    player_id: new.player_id,
                    x: new.x,
                    y: new.y,
                    move_number: new.move_number,
                    created_at: chrono::Utc::now(),
                })
            });

        let ledger = MoveLedger::new(games(1).await, Arc::new(repo));
        assert_eq!(ledger.record_move(GameId(1), PlayerId(1), 0, 0).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_record_move_storage_failure_propagates() {
        let mut repo = MockMoveRepository::new();
        repo.expect_max_move_number().returning(|_| Ok(0));
        repo.expect_insert()
            .returning(|_| Err(StoreError::Unavailable("down".into())));

        let ledger = MoveLedger::new(games(1).await, Arc::new(repo));
        let err = ledger.record_move(GameId(1), PlayerId(1), 0, 0).await.unwrap_err();
        assert!(matches!(err, MatchError::Persistence(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_record_move_gives_up_after_repeated_conflicts() {
        let mut repo = MockMoveRepository::new();
        repo.expect_max_move_number().times(MAX_ATTEMPTS).returning(|_| Ok(0));
        repo.expect_insert()
            .times(MAX_ATTEMPTS)
            .returning(|_| Err(StoreError::Conflict("taken".into())));

        let ledger = MoveLedger::new(games(1).await, Arc::new(repo));
        let err = ledger.record_move(GameId(1), PlayerId(1), 0, 0).await.unwrap_err();
        assert!(matches!(err, MatchError::Persistence(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_record_move_unknown_game_is_rejected() {
        let mut repo = MockMoveRepository::new();
        repo.expect_max_move_number().never();
        repo.expect_insert().never();

        let ledger = MoveLedger::new(games(1).await, Arc::new(repo));
        let err = ledger.record_move(GameId(999), PlayerId(1), 0, 0).await.unwrap_err();
        assert!(matches!(err, MatchError::NotFound(GameId(999))));
    }

    #[tokio::test]
    async fn test_record_move_releases_lock_entry() {
        let ledger = MoveLedger::new(games(3).await, Arc::new(InMemoryMoveRepository::new()));
        for g in 1..=3 {
            ledger.record_move(GameId(g), PlayerId(1), 0, 0).await.unwrap();
        }
        assert_eq!(ledger.tracked_games().await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_record_move_lock_table_empties_after_contention() {
        let ledger = MoveLedger::new(games(1).await, Arc::new(InMemoryMoveRepository::new()));

        let mut tasks = Vec::new();
        for p in 1..=8u64 {
            let ledger = ledger.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..10 {
                    ledger.record_move(GameId(1), PlayerId(p), i, i).await.unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(ledger.moves(GameId(1)).await.unwrap().len(), 80);
        assert_eq!(ledger.tracked_games().await, 0);
    }
}
