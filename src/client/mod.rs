//! Client connections
//!
//! Per-connection WebSocket handling.

pub mod handler;

pub use handler::handle_client;
