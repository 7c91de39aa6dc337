//! Frame decoding and encoding
//!
//! Turns WebSocket frames into `ClientMessage`s and `ServerMessage`s into
//! text frames.

use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;

use crate::error::ProtocolError;
use crate::protocol::{ClientMessage, ServerMessage};

/// Parses one JSON record into a `ClientMessage`.
///
/// The record must be a JSON object; arrays and scalars are rejected even
/// when their elements line up with a known message.
pub fn parse_message(raw: &str) -> Result<ClientMessage, ProtocolError> {
    let value: Value = serde_json::from_str(raw)?;
    if !value.is_object() {
        return Err(ProtocolError::NotAnObject);
    }
    Ok(serde_json::from_value(value)?)
}

/// Decodes a data frame.
///
/// Returns `Ok(None)` for control frames, which carry no record.
/// Binary frames are accepted when they hold UTF-8 JSON.
pub fn decode_frame(frame: &Message) -> Result<Option<ClientMessage>, ProtocolError> {
    match frame {
        Message::Text(text) => parse_message(text.as_str()).map(Some),
        Message::Binary(bytes) => {
            let raw = std::str::from_utf8(bytes).map_err(|_| ProtocolError::InvalidUtf8)?;
            parse_message(raw).map(Some)
        }
        _ => Ok(None),
    }
}

/// Serializes a `ServerMessage` into a text frame.
pub fn encode_message(message: &ServerMessage) -> Result<Message, serde_json::Error> {
    Ok(Message::text(serde_json::to_string(message)?))
}
