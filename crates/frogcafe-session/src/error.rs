//! Error types for the session layer.

/// Failures reported by a storage backend.
///
/// Repositories only distinguish "the write collides with an existing
/// row" from "the backend could not do it". Everything else is the
/// caller's business.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backend is down, timed out, or otherwise failed.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Errors that can occur in session and account handling.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session exists for the token.
    #[error("invalid session")]
    InvalidSession,

    /// The token existed but its window had passed. The record has been
    /// removed, so the next attempt gets [`InvalidSession`](Self::InvalidSession).
    #[error("session expired")]
    SessionExpired,

    /// Unknown username or wrong password. Deliberately the same error
    /// for both.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// No player has this id.
    #[error("player {0} not found")]
    PlayerNotFound(frogcafe_protocol::PlayerId),

    /// Required input was missing or empty.
    #[error("bad input: {0}")]
    BadInput(String),

    /// Username or email already taken.
    #[error("{0}")]
    Conflict(String),

    /// The password hasher failed or its worker was lost.
    #[error("password hashing failed: {0}")]
    Hashing(String),

    /// Storage failed underneath an operation.
    #[error(transparent)]
    Persistence(#[from] StoreError),
}
