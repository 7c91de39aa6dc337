use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use log::{debug, warn};
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

use crate::error::RelayError;
use crate::middleware::logging::log_connection;
use crate::protocol::decode_frame;
use crate::relay::{ConnectionState, Router};
use crate::session::SessionId;

/// Handles one game client using Tokio async runtime.
///
/// - Upgrades the TCP stream to a WebSocket.
/// - Spawns a writer task that drains the connection's outbound queue.
/// - Routes inbound records in arrival order until the peer goes away or
///   sends something undecodable.
/// - Runs the departure hook exactly once, whatever ended the loop.
pub async fn handle_client(
    stream: TcpStream,
    client_addr: SocketAddr,
    id: SessionId,
    router: Router,
    queue_capacity: usize,
) {
    log_connection(id, &client_addr);

    match run_session(stream, id, router, queue_capacity).await {
        Ok(()) => debug!("Connection {} closed by client {}", id, client_addr),
        Err(e) if e.is_connection_closed() => {
            debug!("Connection {} dropped by client {}: {}", id, client_addr, e)
        }
        Err(e) => warn!("Connection {} from {} terminated: {}", id, client_addr, e),
    }
}

async fn run_session(
    stream: TcpStream,
    id: SessionId,
    router: Router,
    queue_capacity: usize,
) -> Result<(), RelayError> {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_write, mut ws_read) = ws_stream.split();
    let (tx, mut rx) = mpsc::channel::<Message>(queue_capacity);

    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(e) = ws_write.send(frame).await {
                debug!("Write to connection {} failed: {}", id, e);
                return;
            }
        }
        let _ = ws_write.close().await;
    });

    let mut conn = ConnectionState::new(id, tx);
    let result = read_loop(&mut ws_read, &router, &mut conn).await;

    if let Err(e) = router.disconnect(conn).await {
        warn!("Departure of connection {} not announced: {}", id, e);
    }
    // The outbound queue is closed by now; frames still queued for a
    // departed peer are discarded.
    writer.abort();

    result
}

async fn read_loop(
    ws_read: &mut SplitStream<WebSocketStream<TcpStream>>,
    router: &Router,
    conn: &mut ConnectionState,
) -> Result<(), RelayError> {
    while let Some(frame) = ws_read.next().await {
        let frame = frame?;
        if frame.is_close() {
            break;
        }
        let Some(message) = decode_frame(&frame)? else {
            continue;
        };
        let outcome = router.route(conn, message).await?;
        debug!("Connection {}: {:?}", conn.id(), outcome);
    }
    Ok(())
}
