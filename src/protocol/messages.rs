//! Module `messages`
//!
//! Defines the JSON records exchanged with game clients. Every record is an
//! object carrying a `type` discriminator.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::session::SessionId;

/// World-space position of a player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    /// Where a player stands until their first update arrives.
    pub const SPAWN: Position = Position {
        x: 0.0,
        y: 40.0,
        z: 0.0,
    };
}

impl Default for Position {
    fn default() -> Self {
        Self::SPAWN
    }
}

/// Look direction of a player, in the client's own units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub yaw: f64,
    pub pitch: f64,
}

/// Records sent by a game client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    Join {
        name: String,
        #[serde(rename = "worldType", default)]
        world_type: Option<String>,
    },
    PlayerUpdate {
        position: Position,
        rotation: Rotation,
    },
    /// `block_type` is relayed untouched; clients send `null` for removal.
    BlockChange {
        x: i64,
        y: i64,
        z: i64,
        #[serde(rename = "blockType")]
        block_type: Value,
    },
    /// Any `type` the relay does not know about.
    #[serde(other)]
    Unknown,
}

/// Records sent by the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    PlayerUpdate {
        id: SessionId,
        name: String,
        position: Position,
        rotation: Rotation,
    },
    BlockChange {
        x: i64,
        y: i64,
        z: i64,
        #[serde(rename = "blockType")]
        block_type: Value,
    },
    PlayerLeft {
        id: SessionId,
    },
}
