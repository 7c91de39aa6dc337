//! Voxel Relay - Entry Point
//!
//! Relays player positions and block edits between clients of a
//! multiplayer block-building game.

use log::{error, info};

use voxel_relay::{Server, ServerConfig};

#[tokio::main]
async fn main() {
    // Default to info; RUST_LOG still overrides
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("{}", "=".repeat(50));
    info!("Voxel Multiplayer Relay");
    info!("{}", "=".repeat(50));
    info!("Server starting on {}", config.ws_url());
    info!("Players can now connect and play together!");

    let server = match Server::bind(config).await {
        Ok(server) => server,
        Err(e) => {
            error!("Server startup failed: {}", e);
            std::process::exit(1);
        }
    };

    tokio::select! {
        _ = server.run() => {}
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Server shutting down...");
        }
    }
}
