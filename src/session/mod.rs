//! Player sessions
//!
//! Session ids, per-player state and the shared registry of joined players.

pub mod id;
pub mod participant;
pub mod registry;

pub use id::SessionId;
pub use participant::Participant;
pub use registry::SessionRegistry;
