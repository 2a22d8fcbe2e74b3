//! Match configuration and the color assignment policy.

use frogcafe_protocol::{GameId, PlayerId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// MatchConfig
// ---------------------------------------------------------------------------

/// Configuration for game creation and joining.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Board size used when a creator asks for 0 or nothing.
    pub default_board_size: u32,

    /// Rating gap beyond which the weaker player gets Black. Within the
    /// margin, game id parity decides.
    pub rating_margin: i32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            default_board_size: 19,
            rating_margin: 50,
        }
    }
}

impl MatchConfig {
    /// Resolves a requested board size, falling back to the default.
    pub fn board_size(&self, requested: Option<u32>) -> u32 {
        match requested {
            Some(size) if size > 0 => size,
            _ => self.default_board_size,
        }
    }
}

// ---------------------------------------------------------------------------
// Seating
// ---------------------------------------------------------------------------

/// Who plays which color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seating {
    pub black: PlayerId,
    pub white: PlayerId,
}

/// Picks colors for a game being joined.
///
/// Black moves first, so it goes to the weaker player:
///
/// ```text
/// d = creator_rating - joiner_rating
/// d < -margin  → creator is Black
/// d >  margin  → joiner is Black
/// otherwise    → even game id: creator Black, odd: joiner Black
/// ```
///
/// The parity tie-break is deterministic on purpose: replaying a join
/// gives the same seating.
pub fn assign_colors(
    game_id: GameId,
    creator: (PlayerId, i32),
    joiner: (PlayerId, i32),
    margin: i32,
) -> Seating {
    let (creator_id, creator_rating) = creator;
    let (joiner_id, joiner_rating) = joiner;
    let d = i64::from(creator_rating) - i64::from(joiner_rating);
    let margin = i64::from(margin);

    let creator_black = if d < -margin {
        true
    } else if d > margin {
        false
    } else {
        game_id.is_even()
    };

    if creator_black {
        Seating {
            black: creator_id,
            white: joiner_id,
        }
    } else {
        Seating {
            black: joiner_id,
            white: creator_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CREATOR: PlayerId = PlayerId(1);
    const JOINER: PlayerId = PlayerId(2);

    fn seat(game: u64, creator_rating: i32, joiner_rating: i32) -> Seating {
        assign_colors(
            GameId(game),
            (CREATOR, creator_rating),
            (JOINER, joiner_rating),
            50,
        )
    }

    #[test]
    fn test_assign_colors_weaker_creator_gets_black() {
        let s = seat(1, 1400, 1500);
        assert_eq!(s.black, CREATOR);
        assert_eq!(s.white, JOINER);
    }

    #[test]
    fn test_assign_colors_weaker_joiner_gets_black() {
        let s = seat(2, 1600, 1500);
        assert_eq!(s.black, JOINER);
        assert_eq!(s.white, CREATOR);
    }

    #[test]
    fn test_assign_colors_close_ratings_even_game_creator_black() {
        assert_eq!(seat(2, 1520, 1500).black, CREATOR);
    }

    #[test]
    fn test_assign_colors_close_ratings_odd_game_joiner_black() {
        assert_eq!(seat(3, 1520, 1500).black, JOINER);
    }

    #[test]
    fn test_assign_colors_margin_is_inclusive() {
        // Exactly 50 apart is still "close".
        assert_eq!(seat(3, 1450, 1500).black, JOINER);
        assert_eq!(seat(2, 1550, 1500).black, CREATOR);
        // 51 apart is not.
        assert_eq!(seat(3, 1449, 1500).black, CREATOR);
        assert_eq!(seat(2, 1551, 1500).black, JOINER);
    }

    #[test]
    fn test_assign_colors_extreme_ratings_do_not_overflow() {
        assert_eq!(seat(1, i32::MIN, i32::MAX).black, CREATOR);
        assert_eq!(seat(1, i32::MAX, i32::MIN).black, JOINER);
    }

    #[test]
    fn test_match_config_board_size_fallback() {
        let config = MatchConfig::default();
        assert_eq!(config.board_size(None), 19);
        assert_eq!(config.board_size(Some(0)), 19);
        assert_eq!(config.board_size(Some(9)), 9);
    }
}
