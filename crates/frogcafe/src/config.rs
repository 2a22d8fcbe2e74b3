//! Server configuration.

use std::time::Duration;

use frogcafe_match::MatchConfig;
use frogcafe_session::SessionConfig;

use crate::hub::HubConfig;
use crate::FrogcafeError;

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    ///
    /// Default: `127.0.0.1:8080`.
    pub bind: String,

    pub session: SessionConfig,
    pub matches: MatchConfig,
    pub hub: HubConfig,

    /// Close a connection that sends nothing for this long. `None` keeps
    /// quiet connections open indefinitely.
    ///
    /// Default: `None`.
    pub idle_timeout: Option<Duration>,

    /// bcrypt work factor for new password hashes.
    ///
    /// Default: `bcrypt::DEFAULT_COST`.
    pub password_cost: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            session: SessionConfig::default(),
            matches: MatchConfig::default(),
            hub: HubConfig::default(),
            idle_timeout: None,
            password_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl ServerConfig {
    /// Reads overrides from the process environment.
    ///
    /// | Variable | Effect |
    /// |---|---|
    /// | `FROGCAFE_BIND` | listen address |
    /// | `PORT` | `0.0.0.0:$PORT`, if `FROGCAFE_BIND` is unset |
    /// | `FROGCAFE_SESSION_TTL_SECS` | session lifetime |
    /// | `FROGCAFE_SWEEP_INTERVAL_SECS` | expired-session sweep period |
    /// | `FROGCAFE_IDLE_TIMEOUT_SECS` | idle connection timeout, `0` disables |
    ///
    /// # Errors
    /// [`FrogcafeError::Config`] if a numeric variable doesn't parse.
    pub fn from_env() -> Result<Self, FrogcafeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading from `lookup` instead.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, FrogcafeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(bind) = lookup("FROGCAFE_BIND") {
            config.bind = bind;
        } else if let Some(port) = lookup("PORT") {
            let port: u16 = parse_number("PORT", &port)?;
            config.bind = format!("0.0.0.0:{port}");
        }
        if let Some(raw) = lookup("FROGCAFE_SESSION_TTL_SECS") {
            config.session.lifetime = secs("FROGCAFE_SESSION_TTL_SECS", &raw)?;
        }
        if let Some(raw) = lookup("FROGCAFE_SWEEP_INTERVAL_SECS") {
            config.session.sweep_interval = secs("FROGCAFE_SWEEP_INTERVAL_SECS", &raw)?;
        }
        if let Some(raw) = lookup("FROGCAFE_IDLE_TIMEOUT_SECS") {
            let timeout = secs("FROGCAFE_IDLE_TIMEOUT_SECS", &raw)?;
            config.idle_timeout = (!timeout.is_zero()).then_some(timeout);
        }

        Ok(config)
    }
}

fn secs(key: &str, raw: &str) -> Result<Duration, FrogcafeError> {
    parse_number(key, raw).map(Duration::from_secs)
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, FrogcafeError> {
    raw.trim()
        .parse()
        .map_err(|_| FrogcafeError::Config(format!("{key}: not a valid number: {raw:?}")))
}
