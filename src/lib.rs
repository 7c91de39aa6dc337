pub mod client;
pub mod error;
pub mod middleware;
pub mod protocol;
pub mod relay;
pub mod server;
pub mod session;

pub use server::{Server, ServerConfig};
