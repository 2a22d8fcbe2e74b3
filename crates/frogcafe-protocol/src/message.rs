//! Wire messages exchanged over a live connection.
//!
//! Every frame is a JSON object `{"type": "...", "data": {...}}`. The
//! recognized types decode into typed payloads; anything else is kept as
//! an opaque [`Frame`] so it can be relayed without the server knowing
//! its shape (chat, cursor hints, whatever the client invents).
//!
//! ```text
//! client ── authenticate ──► server ── auth_success | auth_error ──► client
//! client ── move ──────────► server ── move (enriched) ───────────► watchers
//!                            server ── game_update ───────────────► watchers
//! client ── <anything> ────► server ── <same frame> ──────────────► watchers
//! ```

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Codec, Game, GameId, GameStatus, PlayerId, ProtocolError};

/// Message type names as they appear in the `type` field.
pub mod kind {
    pub const AUTHENTICATE: &str = "authenticate";
    pub const MOVE: &str = "move";
    pub const GAME_UPDATE: &str = "game_update";
    pub const AUTH_SUCCESS: &str = "auth_success";
    pub const AUTH_ERROR: &str = "auth_error";
}

// ---------------------------------------------------------------------------
// Frame: the untyped envelope
// ---------------------------------------------------------------------------

/// The raw `{type, data}` envelope.
///
/// `data` defaults to `null` when a client omits it and is left out again
/// on the way back, so a relayed frame looks like the one that came in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl Frame {
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    /// Reads `data.game_id` when it is a non-negative integer, or a
    /// string holding one.
    pub fn game_id(&self) -> Option<GameId> {
        match self.data.get("game_id")? {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
                .map(GameId),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    fn payload<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        serde_json::from_value(self.data.clone()).map_err(ProtocolError::Decode)
    }
}

// ---------------------------------------------------------------------------
// Typed payloads
// ---------------------------------------------------------------------------

/// `authenticate`: upgrade an anonymous connection with a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticateData {
    pub token: String,
}

/// `move`: a stone placement.
///
/// Clients send only `x` and `y` (plus whatever else their UI wants to
/// carry along in `extra`). The server fills in `game_id`, `player_id`
/// and `move_number` before broadcasting; values a client supplies for
/// those fields are overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveData {
    pub x: i32,
    pub y: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<GameId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<PlayerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub move_number: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MoveData {
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            game_id: None,
            player_id: None,
            move_number: None,
            extra: Map::new(),
        }
    }

    /// Stamps the server-assigned fields onto the payload.
    pub fn enrich(mut self, game_id: GameId, player_id: PlayerId, move_number: u32) -> Self {
        self.game_id = Some(game_id);
        self.player_id = Some(player_id);
        self.move_number = Some(move_number);
        self
    }
}

/// `game_update`: a game changed state (joined, finished).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameUpdateData {
    pub game_id: GameId,
    pub status: GameStatus,
    pub black_player_id: Option<PlayerId>,
    pub white_player_id: Option<PlayerId>,
    pub game: Game,
}

impl From<&Game> for GameUpdateData {
    fn from(game: &Game) -> Self {
        Self {
            game_id: game.id,
            status: game.status,
            black_player_id: game.black_player_id,
            white_player_id: game.white_player_id,
            game: game.clone(),
        }
    }
}

/// `auth_success`: reply to a valid `authenticate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSuccessData {
    pub player_id: PlayerId,
    pub username: String,
}

/// `auth_error`: reply to a rejected `authenticate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthErrorData {
    pub error: String,
}

// ---------------------------------------------------------------------------
// WireMessage: the closed set plus the relay fallback
// ---------------------------------------------------------------------------

/// A decoded wire message.
#[derive(Debug, Clone, PartialEq)]
pub enum WireMessage {
    Authenticate(AuthenticateData),
    Move(MoveData),
    GameUpdate(GameUpdateData),
    AuthSuccess(AuthSuccessData),
    AuthError(AuthErrorData),
    /// Any frame the server does not interpret.
    Relay(Frame),
}

impl WireMessage {
    /// The `type` string this message is sent under.
    pub fn kind(&self) -> &str {
        match self {
            Self::Authenticate(_) => kind::AUTHENTICATE,
            Self::Move(_) => kind::MOVE,
            Self::GameUpdate(_) => kind::GAME_UPDATE,
            Self::AuthSuccess(_) => kind::AUTH_SUCCESS,
            Self::AuthError(_) => kind::AUTH_ERROR,
            Self::Relay(frame) => &frame.kind,
        }
    }

    /// The game whose watchers should receive this message, or `None` to
    /// reach every connection.
    pub fn target_game(&self) -> Option<GameId> {
        match self {
            Self::Move(data) => data.game_id,
            Self::GameUpdate(data) => Some(data.game_id),
            Self::Relay(frame) => frame.game_id(),
            Self::Authenticate(_) | Self::AuthSuccess(_) | Self::AuthError(_) => None,
        }
    }

    /// Converts into the `{type, data}` envelope.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if a payload can't be turned into
    /// a JSON value.
    pub fn into_frame(self) -> Result<Frame, ProtocolError> {
        let kind = self.kind().to_string();
        let data = match self {
            Self::Authenticate(d) => serde_json::to_value(d),
            Self::Move(d) => serde_json::to_value(d),
            Self::GameUpdate(d) => serde_json::to_value(d),
            Self::AuthSuccess(d) => serde_json::to_value(d),
            Self::AuthError(d) => serde_json::to_value(d),
            Self::Relay(frame) => return Ok(frame),
        }
        .map_err(ProtocolError::Encode)?;
        Ok(Frame::new(kind, data))
    }

    /// Decodes a frame received from a client.
    ///
    /// Only `authenticate` and `move` are interpreted. Every other kind,
    /// including the server-originated ones, is relayed untouched.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` when the codec can't read the
    /// envelope (no `type`, say) or an `authenticate`/`move` payload is
    /// malformed.
    pub fn decode_inbound<C: Codec>(codec: &C, bytes: &[u8]) -> Result<Self, ProtocolError> {
        let frame: Frame = codec.decode(bytes)?;
        Ok(match frame.kind.as_str() {
            kind::AUTHENTICATE => Self::Authenticate(frame.payload()?),
            kind::MOVE => Self::Move(frame.payload()?),
            _ => Self::Relay(frame),
        })
    }
}

impl From<GameUpdateData> for WireMessage {
    fn from(data: GameUpdateData) -> Self {
        Self::GameUpdate(data)
    }
}

impl From<Frame> for WireMessage {
    fn from(frame: Frame) -> Self {
        Self::Relay(frame)
    }
}
