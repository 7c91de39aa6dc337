//! Logging middleware
//!
//! Lifecycle log lines for connections and players.

use chrono::Local;
use log::{debug, info};
use std::net::SocketAddr;

use crate::session::SessionId;

fn clock() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// Log an accepted connection
pub fn log_connection(id: SessionId, addr: &SocketAddr) {
    debug!("Connection {} accepted from {}", id, addr);
}

/// Log a player completing `join`
pub fn log_join(name: &str, id: SessionId) {
    info!("[{}] {} joined (ID: {})", clock(), name, id);
}

/// Log a registered player going away
pub fn log_leave(name: &str, id: SessionId) {
    info!("[{}] {} left (ID: {})", clock(), name, id);
}
