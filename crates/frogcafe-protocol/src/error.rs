//! Error types for the protocol layer.
//!
//! Each crate in Frogcafe defines its own error enum. A `ProtocolError`
//! always means the problem is in parsing or serializing, not in
//! networking or game rules.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into JSON).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing required fields,
    /// or wrong data types.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// An identifier (game id, player id) could not be parsed.
    #[error("invalid {kind} id: {value:?}")]
    InvalidId {
        /// Which identifier was being parsed ("game", "player").
        kind: &'static str,
        /// The raw input.
        value: String,
    },

    /// The message is well-formed JSON but violates the protocol.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
