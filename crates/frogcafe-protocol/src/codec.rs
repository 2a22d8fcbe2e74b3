//! Codec trait and the JSON implementation.
//!
//! A codec converts between Rust types and the text that travels in a
//! WebSocket frame. The rest of the workspace only depends on the
//! [`Codec`] trait, so the encoding can be swapped without touching the
//! hub or the connection pumps.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// A codec that can encode Rust types to text frames and decode frames
/// back.
///
/// `Send + Sync + 'static` because a codec lives inside long-running
/// tasks (the hub, every connection) that Tokio may move between threads.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a text frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes raw frame bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use frogcafe_protocol::{Codec, Frame, JsonCodec};
///
/// let codec = JsonCodec;
/// let frame = Frame::new("chat", serde_json::json!({ "text": "hi" }));
///
/// let text = codec.encode(&frame).unwrap();
/// let decoded: Frame = codec.decode(text.as_bytes()).unwrap();
/// assert_eq!(frame, decoded);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
