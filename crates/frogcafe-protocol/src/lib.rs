//! Wire protocol and shared domain types for Frogcafe.
//!
//! - **Types** ([`PlayerId`], [`GameId`], [`Game`], [`Move`]) shared by
//!   the session, match and server crates.
//! - **Messages** ([`WireMessage`], [`Frame`]) that travel over a live
//!   connection.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) turning them into text.
//!
//! The protocol layer knows nothing about connections or storage.
//!
//! ```text
//! Transport (text) → Protocol (WireMessage) → Hub / Ledger
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod error;
pub mod message;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use message::{
    AuthErrorData, AuthSuccessData, AuthenticateData, Frame, GameUpdateData,
    MoveData, WireMessage,
};
pub use types::{Game, GameId, GameStatus, Move, PlayerId};
