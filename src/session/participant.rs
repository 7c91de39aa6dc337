//! Module `participant`
//!
//! Defines the `Participant` struct: the relay's view of one connected
//! player, plus the outbound queue used to reach them.

use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_tungstenite::tungstenite::Message;

use crate::error::DeliveryError;
use crate::protocol::{Position, Rotation, ServerMessage};
use crate::session::SessionId;

pub const DEFAULT_NAME: &str = "Unknown";
pub const DEFAULT_WORLD_TYPE: &str = "normal";

#[derive(Debug, Clone, Copy, Default)]
struct Transform {
    position: Position,
    rotation: Rotation,
}

/// Server-side state of a connected player.
///
/// The pose sits behind its own lock so updates from different players only
/// need shared access to the registry. The outbound sender is owned by this
/// record alone; dropping the record closes the queue, which stops the
/// connection's writer task.
#[derive(Debug)]
pub struct Participant {
    id: SessionId,
    name: String,
    world_type: String,
    transform: Mutex<Transform>,
    outbound: mpsc::Sender<Message>,
}

impl Participant {
    pub fn new(id: SessionId, outbound: mpsc::Sender<Message>) -> Self {
        Self {
            id,
            name: DEFAULT_NAME.to_string(),
            world_type: DEFAULT_WORLD_TYPE.to_string(),
            transform: Mutex::new(Transform {
                position: Position::SPAWN,
                rotation: Rotation::default(),
            }),
            outbound,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn world_type(&self) -> &str {
        &self.world_type
    }

    fn transform(&self) -> MutexGuard<'_, Transform> {
        // A panic mid-update leaves two plain Copy fields; still usable.
        self.transform.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn position(&self) -> Position {
        self.transform().position
    }

    pub fn rotation(&self) -> Rotation {
        self.transform().rotation
    }

    /// Applies the name and world type announced in `join`.
    pub fn set_identity(&mut self, name: String, world_type: Option<String>) {
        self.name = name;
        self.world_type = world_type.unwrap_or_else(|| DEFAULT_WORLD_TYPE.to_string());
    }

    /// Stores a new pose. Takes `&self`; the pose has its own lock.
    pub fn set_transform(&self, position: Position, rotation: Rotation) {
        *self.transform() = Transform { position, rotation };
    }

    /// The `playerUpdate` record describing this participant's current pose.
    pub fn snapshot(&self) -> ServerMessage {
        let transform = *self.transform();
        ServerMessage::PlayerUpdate {
            id: self.id,
            name: self.name.clone(),
            position: transform.position,
            rotation: transform.rotation,
        }
    }

    /// Queues a frame without waiting.
    pub fn deliver(&self, frame: Message) -> Result<(), DeliveryError> {
        self.outbound.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::QueueFull(self.id),
            TrySendError::Closed(_) => DeliveryError::Closed(self.id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_before_join() {
        let (tx, _rx) = mpsc::channel(1);
        let p = Participant::new(SessionId::new(1), tx);
        assert_eq!(p.name(), "Unknown");
        assert_eq!(p.world_type(), "normal");
        assert_eq!(p.position(), Position::SPAWN);
        assert_eq!(p.rotation(), Rotation::default());
    }

    #[test]
    fn missing_world_type_falls_back_to_default() {
        let (tx, _rx) = mpsc::channel(1);
        let mut p = Participant::new(SessionId::new(1), tx);
        p.set_identity("Alice".into(), Some("flat".into()));
        assert_eq!(p.world_type(), "flat");
        p.set_identity("Alice".into(), None);
        assert_eq!(p.world_type(), "normal");
    }

    #[test]
    fn transform_updates_through_shared_reference() {
        let (tx, _rx) = mpsc::channel(1);
        let p = Participant::new(SessionId::new(2), tx);
        let shared = &p;
        let position = Position {
            x: 1.0,
            y: 41.0,
            z: 2.0,
        };
        let rotation = Rotation {
            yaw: 90.0,
            pitch: 0.0,
        };

        shared.set_transform(position, rotation);

        assert_eq!(p.position(), position);
        assert_eq!(p.rotation(), rotation);
    }

    #[test]
    fn deliver_reports_full_and_closed_queues() {
        let (tx, rx) = mpsc::channel(1);
        let p = Participant::new(SessionId::new(3), tx);

        assert!(p.deliver(Message::text("a")).is_ok());
        assert_eq!(
            p.deliver(Message::text("b")),
            Err(DeliveryError::QueueFull(SessionId::new(3)))
        );

        drop(rx);
        assert_eq!(
            p.deliver(Message::text("c")),
            Err(DeliveryError::Closed(SessionId::new(3)))
        );
    }
}
