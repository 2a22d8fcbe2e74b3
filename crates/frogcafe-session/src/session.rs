//! Session and player records.
//!
//! A session is the server's record of a logged-in player: an opaque
//! token plus the window during which it stays valid. The window slides
//! forward while the player is active.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use frogcafe_protocol::PlayerId;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Timing knobs for the session store.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a token stays valid after its last renewal.
    ///
    /// Default: 7 days.
    pub lifetime: Duration,

    /// Activity inside this window does not renew the session, so a busy
    /// client doesn't write on every request.
    ///
    /// Default: 30 minutes.
    pub renewal_grace: Duration,

    /// How often the background sweeper purges expired records.
    ///
    /// Default: 1 hour.
    pub sweep_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lifetime: Duration::from_secs(7 * 24 * 60 * 60),
            renewal_grace: Duration::from_secs(30 * 60),
            sweep_interval: Duration::from_secs(60 * 60),
        }
    }
}

impl SessionConfig {
    pub(crate) fn lifetime_delta(&self) -> TimeDelta {
        to_delta(self.lifetime)
    }

    pub(crate) fn renewal_grace_delta(&self) -> TimeDelta {
        to_delta(self.renewal_grace)
    }
}

fn to_delta(d: Duration) -> TimeDelta {
    TimeDelta::from_std(d).unwrap_or(TimeDelta::MAX)
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A persisted session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub player_id: PlayerId,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// A fresh session starting at `now`.
    pub fn new(
        token: String,
        player_id: PlayerId,
        now: DateTime<Utc>,
        lifetime: TimeDelta,
    ) -> Self {
        Self {
            token,
            player_id,
            created_at: now,
            last_activity: now,
            expires_at: now
                .checked_add_signed(lifetime)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Dead once the clock is strictly past `expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whether enough time has passed since the last renewal to slide
    /// the window again.
    pub fn needs_renewal(&self, now: DateTime<Utc>, grace: TimeDelta) -> bool {
        now - self.last_activity > grace
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// Rating every new account starts with.
pub const DEFAULT_RATING: i32 = 1500;

/// A registered player, as returned to clients. The password hash lives
/// next to this record in storage and never leaves the repository except
/// through [`PlayerRepository::find_credentials`](crate::PlayerRepository::find_credentials).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    pub email: String,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a player row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPlayer {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub rating: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.lifetime_delta(), TimeDelta::days(7));
        assert_eq!(config.renewal_grace_delta(), TimeDelta::minutes(30));
        assert_eq!(config.sweep_interval, Duration::from_secs(3600));
    }

    #[test]
    fn test_session_is_expired_only_past_deadline() {
        let now = Utc::now();
        let session = Session::new("t".into(), PlayerId(1), now, TimeDelta::days(7));
        assert!(!session.is_expired(now + TimeDelta::days(7)));
        assert!(session.is_expired(now + TimeDelta::days(7) + TimeDelta::seconds(1)));
    }

    #[test]
    fn test_session_needs_renewal_after_grace() {
        let now = Utc::now();
        let session = Session::new("t".into(), PlayerId(1), now, TimeDelta::days(7));
        let grace = TimeDelta::minutes(30);
        assert!(!session.needs_renewal(now + TimeDelta::minutes(30), grace));
        assert!(session.needs_renewal(now + TimeDelta::minutes(31), grace));
    }

    #[test]
    fn test_to_delta_saturates_on_overflow() {
        assert_eq!(to_delta(Duration::MAX), TimeDelta::MAX);
    }
}
