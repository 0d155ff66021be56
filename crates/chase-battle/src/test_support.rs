//! Test doubles for the host seams.

use std::sync::Mutex;

use chase_common::{Event, EventBus, Participant, ParticipantId};
use tokio::sync::broadcast;

use crate::registry::{ChatSink, ConnectionRegistry, Slot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Broadcast(String),
    Direct(ParticipantId, String),
}

impl Sent {
    pub fn text(&self) -> &str {
        match self {
            Sent::Broadcast(text) | Sent::Direct(_, text) => text,
        }
    }
}

/// Records every send in order.
#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingSink {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// Only `CHASE_BATTLE:` and `CHASE_END:` lines, in order.
    pub fn protocol_lines(&self) -> Vec<String> {
        self.sent()
            .iter()
            .map(|s| s.text().to_string())
            .filter(|t| t.starts_with("CHASE_BATTLE:") || t.starts_with("CHASE_END:"))
            .collect()
    }

    pub fn direct_to(&self, id: ParticipantId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Direct(to, text) if to == id => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.sent().iter().any(|s| s.text().contains(needle))
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

impl ChatSink for RecordingSink {
    fn broadcast(&self, message: &str) {
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Broadcast(message.to_string()));
    }

    fn send_to(&self, id: ParticipantId, message: &str) {
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Direct(id, message.to_string()));
    }
}

/// In-memory slot table with an event bus.
pub struct FakeRegistry {
    slots: Mutex<Vec<Slot>>,
    next_connection: Mutex<u64>,
    bus: EventBus,
}

impl FakeRegistry {
    pub fn new(slots: usize) -> Self {
        Self {
            slots: Mutex::new(vec![Slot::Empty; slots]),
            next_connection: Mutex::new(1),
            bus: EventBus::new(64),
        }
    }

    pub fn connect(&self, id: ParticipantId, name: &str) -> Participant {
        let connection = {
            let mut next = self.next_connection.lock().unwrap();
            *next += 1;
            *next
        };
        let participant = Participant::new(id, name).with_connection(connection);
        self.slots.lock().unwrap()[id.index()] = Slot::Occupied(participant.clone());
        participant
    }

    /// Free the slot, then announce the connection that held it.
    pub fn disconnect(&self, id: ParticipantId) {
        let previous = std::mem::replace(&mut self.slots.lock().unwrap()[id.index()], Slot::Empty);
        if let Slot::Occupied(participant) = previous {
            self.bus.publish(Event::ParticipantDisconnected(participant));
        }
    }

    pub fn set_ai(&self, id: ParticipantId) {
        self.slots.lock().unwrap()[id.index()] = Slot::Ai;
    }
}

impl ConnectionRegistry for FakeRegistry {
    fn slot_count(&self) -> usize {
        self.slots.lock().unwrap().len()
    }

    fn slot(&self, id: ParticipantId) -> Option<Slot> {
        self.slots.lock().unwrap().get(id.index()).cloned()
    }

    fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }
}
