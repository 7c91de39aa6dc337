//! Configuration management for the relay
//!
//! Settings come from built-in defaults, then an optional `config.toml` in
//! the working directory, then `VOXEL_RELAY_*` environment variables.

use config::{Config, Environment, File};
use serde::Deserialize;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8765;
pub const DEFAULT_MAX_CONNECTIONS: usize = 256;
pub const DEFAULT_OUTBOUND_QUEUE_CAPACITY: usize = 1024;

/// Relay configuration
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host name or IP address to listen on
    pub host: String,

    /// WebSocket port. Port 0 asks the OS for a free one, which only code
    /// (tests) may request.
    pub port: u16,

    /// Connections beyond this many are closed right after accept
    pub max_connections: usize,

    /// Frames buffered per connection before further frames to it are dropped
    pub outbound_queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            outbound_queue_capacity: DEFAULT_OUTBOUND_QUEUE_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// Load configuration from config.toml with environment overrides
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from the named file (extension optional) with
    /// environment overrides. A missing file is not an error.
    pub fn load_from(path: &str) -> Result<Self, config::ConfigError> {
        let settings = Config::builder()
            .set_default("host", DEFAULT_HOST)?
            .set_default("port", i64::from(DEFAULT_PORT))?
            .set_default("max_connections", DEFAULT_MAX_CONNECTIONS as i64)?
            .set_default(
                "outbound_queue_capacity",
                DEFAULT_OUTBOUND_QUEUE_CAPACITY as i64,
            )?
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("VOXEL_RELAY"))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.host.trim().is_empty() {
            return Err(config::ConfigError::Message("host cannot be empty".into()));
        }

        if self.port == 0 {
            return Err(config::ConfigError::Message("port cannot be 0".into()));
        }

        if self.max_connections == 0 {
            return Err(config::ConfigError::Message(
                "max_connections must be greater than 0".into(),
            ));
        }

        if self.outbound_queue_capacity == 0 {
            return Err(config::ConfigError::Message(
                "outbound_queue_capacity must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Get host and port as a bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// WebSocket URL clients should connect to
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.bind_address())
    }
}
