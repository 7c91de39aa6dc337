//! Error types
//!
//! Defines the error types raised by each layer of the relay.

use std::fmt;
use std::io;

use tokio_tungstenite::tungstenite;

use crate::session::SessionId;

/// Wire decoding errors
#[derive(Debug)]
pub enum ProtocolError {
    InvalidJson(serde_json::Error),
    NotAnObject,
    InvalidUtf8,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::InvalidJson(e) => write!(f, "Invalid message: {}", e),
            ProtocolError::NotAnObject => write!(f, "Record is not a JSON object"),
            ProtocolError::InvalidUtf8 => write!(f, "Binary frame is not valid UTF-8"),
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<serde_json::Error> for ProtocolError {
    fn from(error: serde_json::Error) -> Self {
        ProtocolError::InvalidJson(error)
    }
}

/// Per-recipient delivery failures
///
/// These never leave the fan-out: they are counted and logged, and the
/// sender is not told about them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    QueueFull(SessionId),
    Closed(SessionId),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::QueueFull(id) => write!(f, "Outbound queue full for session {}", id),
            DeliveryError::Closed(id) => write!(f, "Outbound channel closed for session {}", id),
        }
    }
}

impl std::error::Error for DeliveryError {}

/// General relay error that encompasses all error types
#[derive(Debug)]
pub enum RelayError {
    Config(config::ConfigError),
    Io(io::Error),
    WebSocket(tungstenite::Error),
    Protocol(ProtocolError),
    Serialize(serde_json::Error),
}

impl RelayError {
    /// Returns true for the expected ways a peer goes away.
    ///
    /// These end a connection normally and are not reported as failures.
    pub fn is_connection_closed(&self) -> bool {
        match self {
            RelayError::WebSocket(tungstenite::Error::ConnectionClosed)
            | RelayError::WebSocket(tungstenite::Error::AlreadyClosed) => true,
            RelayError::WebSocket(tungstenite::Error::Protocol(
                tungstenite::error::ProtocolError::ResetWithoutClosingHandshake,
            )) => true,
            RelayError::WebSocket(tungstenite::Error::Io(e)) | RelayError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::Config(e) => write!(f, "Configuration error: {}", e),
            RelayError::Io(e) => write!(f, "I/O error: {}", e),
            RelayError::WebSocket(e) => write!(f, "WebSocket error: {}", e),
            RelayError::Protocol(e) => write!(f, "Protocol error: {}", e),
            RelayError::Serialize(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl std::error::Error for RelayError {}

impl From<config::ConfigError> for RelayError {
    fn from(error: config::ConfigError) -> Self {
        RelayError::Config(error)
    }
}

impl From<io::Error> for RelayError {
    fn from(error: io::Error) -> Self {
        RelayError::Io(error)
    }
}

impl From<tungstenite::Error> for RelayError {
    fn from(error: tungstenite::Error) -> Self {
        RelayError::WebSocket(error)
    }
}

impl From<ProtocolError> for RelayError {
    fn from(error: ProtocolError) -> Self {
        RelayError::Protocol(error)
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(error: serde_json::Error) -> Self {
        RelayError::Serialize(error)
    }
}
