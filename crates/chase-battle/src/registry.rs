//! Seams to the host server: who is connected, and how to reach them.

use chase_common::{Event, Participant, ParticipantId};
use tokio::sync::broadcast;

/// State of one participant slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// Reserved for AI traffic; never held by a client.
    Ai,
    Empty,
    Occupied(Participant),
}

/// The host's connection registry.
pub trait ConnectionRegistry: Send + Sync {
    /// Number of slots; valid ids are `0..slot_count()`.
    fn slot_count(&self) -> usize;

    /// Look up a slot. `None` when the id is out of range.
    fn slot(&self, id: ParticipantId) -> Option<Slot>;

    /// Subscribe to connection lifecycle events.
    fn subscribe(&self) -> broadcast::Receiver<Event>;

    /// The client currently holding `id`, if any.
    fn participant(&self, id: ParticipantId) -> Option<Participant> {
        match self.slot(id) {
            Some(Slot::Occupied(p)) => Some(p),
            _ => None,
        }
    }

    /// Whether this exact connection is still live.
    fn is_connected(&self, participant: &Participant) -> bool {
        self.participant(participant.id)
            .is_some_and(|current| current.is_same_connection(participant))
    }
}

/// The host's chat send primitive.
///
/// Called while coordinator state is locked, so implementations must not
/// block and must not call back into the coordinator. Delivery is
/// fire-and-forget.
pub trait ChatSink: Send + Sync {
    fn broadcast(&self, message: &str);
    fn send_to(&self, id: ParticipantId, message: &str);
}
