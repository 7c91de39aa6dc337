//! Message router
//!
//! Applies each decoded client record to the session registry and fans the
//! result out. One `ConnectionState` exists per connection and is driven
//! strictly in arrival order by that connection's handler.

use log::debug;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::error::RelayError;
use crate::middleware::logging::{log_join, log_leave};
use crate::protocol::{ClientMessage, Position, Rotation, ServerMessage};
use crate::relay::FanoutReport;
use crate::session::{Participant, SessionId, SessionRegistry};

/// Per-connection routing state.
///
/// Before `join` the participant record lives here and is invisible to
/// everyone else. `join` moves it into the registry.
#[derive(Debug)]
pub struct ConnectionState {
    id: SessionId,
    pending: Option<Participant>,
}

impl ConnectionState {
    pub fn new(id: SessionId, outbound: mpsc::Sender<Message>) -> Self {
        Self {
            id,
            pending: Some(Participant::new(id, outbound)),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn is_registered(&self) -> bool {
        self.pending.is_none()
    }
}

/// Result of routing one record.
#[derive(Debug, PartialEq, Eq)]
pub enum RouteOutcome {
    /// First `join`; carries the number of snapshot records queued.
    Joined { snapshots: usize },
    /// `join` on an already registered connection.
    Rejoined { snapshots: usize },
    PlayerUpdated(FanoutReport),
    BlockRelayed(FanoutReport),
    /// Sender has not joined yet.
    Unregistered,
    /// Unknown `type`.
    Ignored,
}

/// Routes client records against a shared registry.
#[derive(Debug, Clone)]
pub struct Router {
    registry: Arc<SessionRegistry>,
}

impl Router {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Dispatches a decoded record to its handler.
    pub async fn route(
        &self,
        conn: &mut ConnectionState,
        message: ClientMessage,
    ) -> Result<RouteOutcome, RelayError> {
        match message {
            ClientMessage::Join { name, world_type } => {
                self.handle_join(conn, name, world_type).await
            }
            ClientMessage::PlayerUpdate { position, rotation } => {
                self.handle_player_update(conn, position, rotation).await
            }
            ClientMessage::BlockChange {
                x,
                y,
                z,
                block_type,
            } => {
                let message = ServerMessage::BlockChange {
                    x,
                    y,
                    z,
                    block_type,
                };
                self.handle_block_change(conn, message).await
            }
            ClientMessage::Unknown => {
                debug!("Ignoring record of unknown type from {}", conn.id);
                Ok(RouteOutcome::Ignored)
            }
        }
    }

    async fn handle_join(
        &self,
        conn: &mut ConnectionState,
        name: String,
        world_type: Option<String>,
    ) -> Result<RouteOutcome, RelayError> {
        match conn.pending.take() {
            Some(mut participant) => {
                participant.set_identity(name, world_type);
                log_join(participant.name(), conn.id);
                let snapshots = self.registry.register(participant).await?;
                Ok(RouteOutcome::Joined { snapshots })
            }
            None => {
                log_join(&name, conn.id);
                match self.registry.rejoin(conn.id, name, world_type).await? {
                    Some(snapshots) => Ok(RouteOutcome::Rejoined { snapshots }),
                    None => Ok(RouteOutcome::Unregistered),
                }
            }
        }
    }

    async fn handle_player_update(
        &self,
        conn: &mut ConnectionState,
        position: Position,
        rotation: Rotation,
    ) -> Result<RouteOutcome, RelayError> {
        if !conn.is_registered() {
            debug!("Dropping playerUpdate from unjoined connection {}", conn.id);
            return Ok(RouteOutcome::Unregistered);
        }
        let Some(update) = self
            .registry
            .update_transform(conn.id, position, rotation)
            .await
        else {
            return Ok(RouteOutcome::Unregistered);
        };
        let report = self.registry.broadcast(&update, Some(conn.id)).await?;
        Ok(RouteOutcome::PlayerUpdated(report))
    }

    async fn handle_block_change(
        &self,
        conn: &mut ConnectionState,
        message: ServerMessage,
    ) -> Result<RouteOutcome, RelayError> {
        if !conn.is_registered() {
            debug!("Dropping blockChange from unjoined connection {}", conn.id);
            return Ok(RouteOutcome::Unregistered);
        }
        let report = self.registry.broadcast(&message, Some(conn.id)).await?;
        Ok(RouteOutcome::BlockRelayed(report))
    }

    /// Runs the departure hook. Consumes the state, so it runs once.
    ///
    /// Returns the `playerLeft` fan-out if the connection had joined, `None`
    /// otherwise.
    pub async fn disconnect(
        &self,
        conn: ConnectionState,
    ) -> Result<Option<FanoutReport>, RelayError> {
        if !conn.is_registered() {
            return Ok(None);
        }
        let Some(participant) = self.registry.remove(conn.id).await else {
            return Ok(None);
        };
        log_leave(participant.name(), conn.id);
        drop(participant);

        let left = ServerMessage::PlayerLeft { id: conn.id };
        let report = self.registry.broadcast(&left, None).await?;
        Ok(Some(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct TestClient {
        conn: ConnectionState,
        rx: mpsc::Receiver<Message>,
    }

    impl TestClient {
        fn connect(id: u64) -> Self {
            let (tx, rx) = mpsc::channel(64);
            Self {
                conn: ConnectionState::new(SessionId::new(id), tx),
                rx,
            }
        }

        fn id(&self) -> SessionId {
            self.conn.id()
        }

        fn drain(&mut self) -> Vec<ServerMessage> {
            let mut out = Vec::new();
            while let Ok(frame) = self.rx.try_recv() {
                out.push(serde_json::from_str(frame.to_text().unwrap()).unwrap());
            }
            out
        }
    }

    fn router() -> Router {
        Router::new(Arc::new(SessionRegistry::new()))
    }

    fn join(name: &str) -> ClientMessage {
        ClientMessage::Join {
            name: name.into(),
            world_type: None,
        }
    }

    fn update(x: f64, y: f64, z: f64, yaw: f64) -> ClientMessage {
        ClientMessage::PlayerUpdate {
            position: Position { x, y, z },
            rotation: Rotation { yaw, pitch: 0.0 },
        }
    }

    #[tokio::test]
    async fn registry_size_tracks_joins_and_departures() {
        let router = router();
        let mut a = TestClient::connect(1);
        let mut b = TestClient::connect(2);
        let c = TestClient::connect(3);

        router.route(&mut a.conn, join("Alice")).await.unwrap();
        router.route(&mut b.conn, join("Bob")).await.unwrap();
        assert_eq!(router.registry().len().await, 2);

        // c never joined
        assert_eq!(router.disconnect(c.conn).await.unwrap(), None);
        assert_eq!(router.registry().len().await, 2);

        router.disconnect(a.conn).await.unwrap();
        assert_eq!(router.registry().len().await, 1);
    }

    #[tokio::test]
    async fn update_before_join_is_dropped() {
        let router = router();
        let mut a = TestClient::connect(1);
        let mut b = TestClient::connect(2);
        router.route(&mut b.conn, join("Bob")).await.unwrap();

        let outcome = router.route(&mut a.conn, update(1.0, 2.0, 3.0, 0.0)).await.unwrap();

        assert_eq!(outcome, RouteOutcome::Unregistered);
        assert!(b.drain().is_empty());
        assert!(!router.registry().contains(a.id()).await);
    }

    #[tokio::test]
    async fn block_change_before_join_is_dropped() {
        let router = router();
        let mut a = TestClient::connect(1);
        let mut b = TestClient::connect(2);
        router.route(&mut b.conn, join("Bob")).await.unwrap();

        let block = ClientMessage::BlockChange {
            x: 1,
            y: 2,
            z: 3,
            block_type: json!("dirt"),
        };
        let outcome = router.route(&mut a.conn, block).await.unwrap();

        assert_eq!(outcome, RouteOutcome::Unregistered);
        assert!(b.drain().is_empty());
    }

    #[tokio::test]
    async fn block_change_reaches_others_verbatim() {
        let router = router();
        let mut a = TestClient::connect(1);
        let mut b = TestClient::connect(2);
        let mut c = TestClient::connect(3);
        for (client, name) in [(&mut a, "Alice"), (&mut b, "Bob"), (&mut c, "Carol")] {
            router.route(&mut client.conn, join(name)).await.unwrap();
            client.drain();
        }

        let block = ClientMessage::BlockChange {
            x: -7,
            y: 12,
            z: 30,
            block_type: json!("glass"),
        };
        let outcome = router.route(&mut a.conn, block).await.unwrap();

        let expected = ServerMessage::BlockChange {
            x: -7,
            y: 12,
            z: 30,
            block_type: json!("glass"),
        };
        assert!(matches!(outcome, RouteOutcome::BlockRelayed(ref r) if r.delivered == 2));
        assert!(a.drain().is_empty());
        assert_eq!(b.drain(), vec![expected.clone()]);
        assert_eq!(c.drain(), vec![expected]);
    }

    #[tokio::test]
    async fn unknown_type_keeps_connection_state() {
        let router = router();
        let mut a = TestClient::connect(1);
        router.route(&mut a.conn, join("Alice")).await.unwrap();

        let outcome = router.route(&mut a.conn, ClientMessage::Unknown).await.unwrap();

        assert_eq!(outcome, RouteOutcome::Ignored);
        assert!(router.registry().contains(a.id()).await);
    }

    #[tokio::test]
    async fn second_join_renames_without_duplicating() {
        let router = router();
        let mut a = TestClient::connect(1);
        let mut b = TestClient::connect(2);
        router.route(&mut a.conn, join("Alice")).await.unwrap();
        router.route(&mut b.conn, join("Bob")).await.unwrap();
        b.drain();

        let outcome = router.route(&mut b.conn, join("Robert")).await.unwrap();

        assert_eq!(outcome, RouteOutcome::Rejoined { snapshots: 1 });
        assert_eq!(router.registry().len().await, 2);
        router.route(&mut b.conn, update(0.0, 0.0, 0.0, 0.0)).await.unwrap();
        match a.drain().last() {
            Some(ServerMessage::PlayerUpdate { name, .. }) => assert_eq!(name, "Robert"),
            other => panic!("expected PlayerUpdate, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn alice_and_bob() {
        let router = router();
        let mut a = TestClient::connect(1);
        let mut b = TestClient::connect(2);

        let outcome = router.route(&mut a.conn, join("Alice")).await.unwrap();
        assert_eq!(outcome, RouteOutcome::Joined { snapshots: 0 });
        let outcome = router.route(&mut b.conn, join("Bob")).await.unwrap();
        assert_eq!(outcome, RouteOutcome::Joined { snapshots: 1 });

        assert_eq!(
            b.drain(),
            vec![ServerMessage::PlayerUpdate {
                id: a.id(),
                name: "Alice".into(),
                position: Position::SPAWN,
                rotation: Rotation::default(),
            }]
        );
        assert!(a.drain().is_empty());

        router.route(&mut a.conn, update(1.0, 41.0, 2.0, 90.0)).await.unwrap();
        assert_eq!(
            b.drain(),
            vec![ServerMessage::PlayerUpdate {
                id: a.id(),
                name: "Alice".into(),
                position: Position {
                    x: 1.0,
                    y: 41.0,
                    z: 2.0
                },
                rotation: Rotation {
                    yaw: 90.0,
                    pitch: 0.0
                },
            }]
        );
        assert!(a.drain().is_empty());

        let a_id = a.id();
        let report = router.disconnect(a.conn).await.unwrap();
        assert_eq!(report.map(|r| r.delivered), Some(1));
        assert_eq!(b.drain(), vec![ServerMessage::PlayerLeft { id: a_id }]);
        assert!(!router.registry().contains(a_id).await);
        assert!(router.registry().contains(b.id()).await);
        assert_eq!(router.registry().len().await, 1);
    }
}
