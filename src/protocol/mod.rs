//! Relay wire protocol
//!
//! JSON records over WebSocket text frames.

pub mod messages;
pub mod parser;

pub use messages::{ClientMessage, Position, Rotation, ServerMessage};
pub use parser::{decode_frame, encode_message, parse_message};
