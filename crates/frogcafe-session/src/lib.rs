//! Sessions and player accounts for Frogcafe.
//!
//! This crate answers "who is this?" for every other layer:
//!
//! 1. **Accounts** ([`Accounts`]): register, log in, log out
//! 2. **Sessions** ([`SessionStore`]): opaque bearer tokens with a sliding
//!    7-day window and a background sweeper
//! 3. **Authentication** ([`Authenticator`]): the seam live connections
//!    use to turn a token into a player
//!
//! # How it fits in the stack
//!
//! ```text
//! Server / Hub (above)   ← authenticates connections, serves accounts
//!     ↕
//! Session Layer (this crate)
//!     ↕
//! Storage (below)        ← SessionRepository, PlayerRepository
//! ```

mod accounts;
mod auth;
mod clock;
mod error;
mod repository;
mod session;
mod store;

pub use accounts::{Accounts, PasswordHasher};
pub use auth::{AuthenticatedPlayer, Authenticator};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{SessionError, StoreError};
pub use repository::{
    InMemoryPlayerRepository, InMemorySessionRepository, PlayerRepository,
    SessionRepository,
};
pub use session::{NewPlayer, Player, Session, SessionConfig, DEFAULT_RATING};
pub use store::SessionStore;
