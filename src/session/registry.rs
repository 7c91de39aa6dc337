//! Session registry
//!
//! The set of players who have joined and are still connected. This is the
//! only state shared between connections.

use log::debug;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::RelayError;
use crate::protocol::{Position, Rotation, ServerMessage, encode_message};
use crate::relay::broadcast::{FanoutReport, fan_out};
use crate::session::{Participant, SessionId};

/// Registry of joined participants keyed by session id.
///
/// Inserts and removals take the write lock, so a fan-out never walks a
/// half-modified map. Nothing awaits while holding either lock.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    players: RwLock<HashMap<SessionId, Participant>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a participant and queues, for it alone, one `playerUpdate`
    /// per other registered participant.
    ///
    /// Returns how many snapshot records were queued. Both steps happen under
    /// one write lock, so the snapshot reaches the newcomer before any later
    /// broadcast does.
    pub async fn register(&self, participant: Participant) -> Result<usize, RelayError> {
        let mut players = self.players.write().await;
        let id = participant.id();
        players.insert(id, participant);
        sync_snapshot(&players, id)
    }

    /// Renames an already registered participant and resends the snapshot.
    ///
    /// Returns `None` if `id` is not registered.
    pub async fn rejoin(
        &self,
        id: SessionId,
        name: String,
        world_type: Option<String>,
    ) -> Result<Option<usize>, RelayError> {
        let mut players = self.players.write().await;
        match players.get_mut(&id) {
            Some(participant) => participant.set_identity(name, world_type),
            None => return Ok(None),
        }
        sync_snapshot(&players, id).map(Some)
    }

    /// Stores a new pose and returns the record to broadcast for it.
    ///
    /// Only the read lock is taken: the pose is guarded per participant, so
    /// updates from different players and fan-outs run side by side.
    /// Returns `None` if `id` is not registered.
    pub async fn update_transform(
        &self,
        id: SessionId,
        position: Position,
        rotation: Rotation,
    ) -> Option<ServerMessage> {
        let players = self.players.read().await;
        let participant = players.get(&id)?;
        participant.set_transform(position, rotation);
        Some(participant.snapshot())
    }

    /// Removes a participant. Dropping the returned record closes its
    /// outbound queue.
    pub async fn remove(&self, id: SessionId) -> Option<Participant> {
        self.players.write().await.remove(&id)
    }

    /// Queues `message` for every registered participant except `exclude`.
    pub async fn broadcast(
        &self,
        message: &ServerMessage,
        exclude: Option<SessionId>,
    ) -> Result<FanoutReport, RelayError> {
        let players = self.players.read().await;
        Ok(fan_out(players.values(), message, exclude)?)
    }

    pub async fn contains(&self, id: SessionId) -> bool {
        self.players.read().await.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.players.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.players.read().await.is_empty()
    }

    /// Current `playerUpdate` record for one participant.
    pub async fn snapshot_of(&self, id: SessionId) -> Option<ServerMessage> {
        self.players.read().await.get(&id).map(Participant::snapshot)
    }
}

/// Queues every other participant's snapshot on `target`'s outbound queue.
fn sync_snapshot(
    players: &HashMap<SessionId, Participant>,
    target: SessionId,
) -> Result<usize, RelayError> {
    let Some(newcomer) = players.get(&target) else {
        return Ok(0);
    };

    let mut sent = 0;
    for other in players.values().filter(|p| p.id() != target) {
        let frame = encode_message(&other.snapshot())?;
        match newcomer.deliver(frame) {
            Ok(()) => sent += 1,
            Err(e) => debug!("Dropped snapshot record: {}", e),
        }
    }
    Ok(sent)
}
