//! Unified error type for Frogcafe.

use frogcafe_match::MatchError;
use frogcafe_protocol::ProtocolError;
use frogcafe_session::{SessionError, StoreError};
use frogcafe_transport::TransportError;

/// Errors from talking to the connection hub.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HubError {
    /// The hub task has stopped; its event queue no longer accepts work.
    #[error("connection hub is closed")]
    Closed,
}

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum FrogcafeError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, bad identifier).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session or account error (invalid token, bad credentials).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A game or move error (not found, invalid state).
    #[error(transparent)]
    Match(#[from] MatchError),

    /// The connection hub is gone.
    #[error(transparent)]
    Hub(#[from] HubError),

    /// Reading configuration failed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl FrogcafeError {
    /// The HTTP status a request layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Session(e) => match e {
                SessionError::InvalidSession
                | SessionError::SessionExpired
                | SessionError::InvalidCredentials => 401,
                SessionError::PlayerNotFound(_) => 404,
                SessionError::BadInput(_) => 400,
                SessionError::Conflict(_) => 409,
                SessionError::Hashing(_) | SessionError::Persistence(_) => 500,
            },
            Self::Match(e) => match e {
                MatchError::NotFound(_) | MatchError::PlayerNotFound(_) => 404,
                MatchError::InvalidState(_) | MatchError::BadInput(_) => 400,
                MatchError::Persistence(StoreError::Conflict(_)) => 409,
                MatchError::Persistence(_) => 500,
            },
            Self::Protocol(ProtocolError::InvalidId { .. })
            | Self::Protocol(ProtocolError::Decode(_))
            | Self::Protocol(ProtocolError::InvalidMessage(_)) => 400,
            Self::Protocol(ProtocolError::Encode(_))
            | Self::Transport(_)
            | Self::Hub(_)
            | Self::Config(_) => 500,
        }
    }
}
