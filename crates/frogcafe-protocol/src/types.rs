//! Core domain types shared by every Frogcafe crate.
//!
//! These are the records that cross crate boundaries and, in the case of
//! [`Game`], travel on the wire inside `game_update` messages.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a registered player.
///
/// Newtype over `u64` so a `GameId` can never be passed where a player is
/// expected. `#[serde(transparent)]` keeps it a bare number in JSON:
/// `PlayerId(42)` serializes as `42`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parses the decimal form used in URLs and query strings (`"42"`).
impl FromStr for PlayerId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_u64(s, "player").map(Self)
    }
}

/// A unique identifier for a game.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GameId(pub u64);

impl GameId {
    /// Whether the numeric id is even. Used as the tie-break when two
    /// players are too close in rating to decide colors.
    pub fn is_even(self) -> bool {
        self.0 % 2 == 0
    }
}

/// The same decimal form [`FromStr`] accepts, so ids in error text can
/// be pasted back into a URL.
impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GameId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_u64(s, "game").map(Self)
    }
}

fn parse_u64(s: &str, kind: &'static str) -> Result<u64, ProtocolError> {
    s.trim().parse::<u64>().map_err(|_| ProtocolError::InvalidId {
        kind,
        value: s.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Game lifecycle
// ---------------------------------------------------------------------------

/// Where a game is in its lifecycle.
///
/// ```text
/// Waiting ──join──► Active ──finish──► Finished
/// ```
///
/// Transitions only move forward. Serialized lowercase (`"waiting"`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    /// Created by one player, open for a second.
    #[default]
    Waiting,
    /// Both seats filled, colors assigned.
    Active,
    /// Terminal.
    Finished,
}

impl GameStatus {
    /// The state that follows this one, or `None` for `Finished`.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Waiting => Some(Self::Active),
            Self::Active => Some(Self::Finished),
            Self::Finished => None,
        }
    }

    /// Whether moving from `self` to `target` is a legal transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }

    /// Only waiting games accept a second player.
    pub fn is_joinable(self) -> bool {
        self == Self::Waiting
    }

    /// The lowercase name used on the wire and in listing filters.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Finished => "finished",
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameStatus {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Self::Waiting),
            "active" => Ok(Self::Active),
            "finished" => Ok(Self::Finished),
            other => Err(ProtocolError::InvalidMessage(format!(
                "unknown game status {other:?}"
            ))),
        }
    }
}

/// A game record as stored and as sent in `game_update` messages.
///
/// Seats are optional until the game is joined: a waiting game has
/// `creator_id` set and both color seats empty. Activation fills both
/// seats atomically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub black_player_id: Option<PlayerId>,
    pub white_player_id: Option<PlayerId>,
    pub board_size: u32,
    pub status: GameStatus,
    pub winner_id: Option<PlayerId>,
    pub creator_id: PlayerId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Game {
    /// Whether `player` occupies one of the two seats.
    pub fn is_seated(&self, player: PlayerId) -> bool {
        self.black_player_id == Some(player) || self.white_player_id == Some(player)
    }
}

/// One recorded move. `move_number` is 1-based and strictly increasing
/// per game with no gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub id: u64,
    pub game_id: GameId,
    pub player_id: PlayerId,
    pub x: i32,
    pub y: i32,
    pub move_number: u32,
    pub created_at: DateTime<Utc>,
}
