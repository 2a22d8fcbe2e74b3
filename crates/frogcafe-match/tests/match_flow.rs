//! Integration tests for the match layer under concurrency.

use std::collections::BTreeSet;
use std::sync::Arc;

use frogcafe_match::{
    GameRepository, InMemoryGameRepository, InMemoryMoveRepository, MatchConfig, MatchError,
    MatchOrchestrator, MoveLedger,
};
use frogcafe_protocol::{GameId, GameStatus, PlayerId};
use frogcafe_session::{InMemoryPlayerRepository, NewPlayer, PlayerRepository, DEFAULT_RATING};

// =========================================================================
// Helpers
// =========================================================================

async fn seed_players(repo: &InMemoryPlayerRepository, n: usize) -> Vec<PlayerId> {
    let mut ids = Vec::with_capacity(n);
    for i in 0..n {
        let player = repo
            .insert(NewPlayer {
                username: format!("player{i}"),
                email: format!("player{i}@example.com"),
                password_hash: "x".into(),
                rating: DEFAULT_RATING,
            })
            .await
            .unwrap();
        ids.push(player.id);
    }
    ids
}

/// A ledger over `n` freshly created games, ids `1..=n`.
async fn ledger_with_games(n: usize) -> MoveLedger {
    let games = InMemoryGameRepository::new();
    for _ in 0..n {
        games.insert(PlayerId(1), 19).await.unwrap();
    }
    MoveLedger::new(Arc::new(games), Arc::new(InMemoryMoveRepository::new()))
}

// =========================================================================
// Move numbering
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_writers_get_gap_free_numbers() {
    const WRITERS: usize = 8;
    const MOVES_EACH: usize = 25;

    let ledger = ledger_with_games(1).await;
    let game = GameId(1);

    let mut tasks = Vec::new();
    for w in 0..WRITERS {
        let ledger = ledger.clone();
        tasks.push(tokio::spawn(async move {
            let mut got = Vec::with_capacity(MOVES_EACH);
            for i in 0..MOVES_EACH {
                let n = ledger
                    .record_move(game, PlayerId(w as u64 + 1), i as i32, w as i32)
                    .await
                    .unwrap();
                got.push(n);
                tokio::task::yield_now().await;
            }
            got
        }));
    }

    let mut all = Vec::new();
    for task in tasks {
        let got = task.await.unwrap();
        // Each writer sees its own numbers strictly increasing.
        assert!(got.windows(2).all(|w| w[0] < w[1]));
        all.extend(got);
    }

    let total = (WRITERS * MOVES_EACH) as u32;
    let unique: BTreeSet<u32> = all.iter().copied().collect();
    assert_eq!(all.len(), unique.len(), "no number handed out twice");
    assert_eq!(unique, (1..=total).collect::<BTreeSet<u32>>());

    let stored: Vec<u32> = ledger
        .moves(game)
        .await
        .unwrap()
        .iter()
        .map(|m| m.move_number)
        .collect();
    assert_eq!(stored, (1..=total).collect::<Vec<u32>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_games_number_independently() {
    let ledger = ledger_with_games(4).await;

    let mut tasks = Vec::new();
    for g in 1..=4u64 {
        let ledger = ledger.clone();
        tasks.push(tokio::spawn(async move {
            for i in 0..10 {
                ledger.record_move(GameId(g), PlayerId(1), i, i).await.unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    for g in 1..=4u64 {
        let numbers: Vec<u32> = ledger
            .moves(GameId(g))
            .await
            .unwrap()
            .iter()
            .map(|m| m.move_number)
            .collect();
        assert_eq!(numbers, (1..=10).collect::<Vec<u32>>());
    }
}

// =========================================================================
// Joining
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_joiners_only_one_wins() {
    let players = Arc::new(InMemoryPlayerRepository::new());
    let ids = seed_players(&players, 6).await;
    let matches = MatchOrchestrator::new(
        Arc::new(InMemoryGameRepository::new()),
        players,
        MatchConfig::default(),
    );

    let creator = ids[0];
    let game = matches.create_game(creator, None).await.unwrap();

    let mut tasks = Vec::new();
    for &joiner in &ids[1..] {
        let matches = matches.clone();
        tasks.push(tokio::spawn(async move { matches.join_game(joiner, game.id).await }));
    }

    let mut winners = Vec::new();
    for task in tasks {
        match task.await.unwrap() {
            Ok(game) => winners.push(game),
            Err(MatchError::InvalidState(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(winners.len(), 1);
    let stored = matches.game(game.id).await.unwrap();
    assert_eq!(stored, winners[0]);
    assert_eq!(stored.status, GameStatus::Active);
    assert!(stored.is_seated(creator));
    assert!(stored.black_player_id.is_some() && stored.white_player_id.is_some());
}
