use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpListener;

use crate::client::handle_client;
use crate::error::RelayError;
use crate::relay::Router;
use crate::server::config::ServerConfig;
use crate::session::{SessionId, SessionRegistry};

pub struct Server {
    listener: TcpListener,
    router: Router,
    config: Arc<ServerConfig>,
    live_connections: Arc<AtomicUsize>,
}

impl Server {
    /// Binds the listener. Nothing is accepted until `run`.
    pub async fn bind(config: ServerConfig) -> Result<Self, RelayError> {
        let address = config.bind_address();
        let listener = match TcpListener::bind(&address).await {
            Ok(listener) => {
                info!("Relay bound to {}", address);
                listener
            }
            Err(e) => {
                error!("Failed to bind to {}: {}", address, e);
                return Err(e.into());
            }
        };

        Ok(Self {
            listener,
            router: Router::new(Arc::new(SessionRegistry::new())),
            config: Arc::new(config),
            live_connections: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, RelayError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(self.router.registry())
    }

    /// Accepts connections until the process is stopped.
    pub async fn run(self) {
        info!(
            "Starting relay on {} (max {} connections)",
            self.config.ws_url(),
            self.config.max_connections
        );

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let Some(slot) = ConnectionSlot::acquire(
                        &self.live_connections,
                        self.config.max_connections,
                    ) else {
                        warn!(
                            "Refusing connection from {}: {} connections open",
                            addr, self.config.max_connections
                        );
                        drop(stream);
                        continue;
                    };

                    let id = SessionId::next();
                    let router = self.router.clone();
                    let queue_capacity = self.config.outbound_queue_capacity;

                    // Spawn a task for each client so accept loop doesn't block
                    tokio::spawn(async move {
                        handle_client(stream, addr, id, router, queue_capacity).await;
                        drop(slot);
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }
    }
}

/// One counted open connection; released on drop.
struct ConnectionSlot(Arc<AtomicUsize>);

impl ConnectionSlot {
    fn acquire(counter: &Arc<AtomicUsize>, max: usize) -> Option<Self> {
        let previous = counter.fetch_add(1, Ordering::SeqCst);
        if previous >= max {
            counter.fetch_sub(1, Ordering::SeqCst);
            return None;
        }
        Some(Self(Arc::clone(counter)))
    }
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
