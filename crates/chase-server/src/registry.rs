//! Client registry: maps participant slots to connected clients' outbound
//! channels.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chase_battle::{ChatSink, ConnectionRegistry, Slot};
use chase_common::{Event, EventBus, Participant, ParticipantId, SERVER_SESSION_ID};
use chase_config::ServerConfig;
use tokio::sync::{broadcast, mpsc};

use crate::protocol::ServerMessage;

struct Client {
    participant: Participant,
    tx: mpsc::Sender<String>,
    admin: bool,
}

enum Entry {
    Ai,
    Empty,
    Client(Client),
}

/// Thread-safe slot table.
pub struct ClientRegistry {
    slots: RwLock<Vec<Entry>>,
    next_connection: AtomicU64,
    events: EventBus,
}

impl ClientRegistry {
    pub fn new(config: &ServerConfig) -> Self {
        let mut slots: Vec<Entry> = (0..config.max_slots).map(|_| Entry::Empty).collect();
        for &ai in &config.ai_slots {
            if let Some(slot) = slots.get_mut(ai as usize) {
                *slot = Entry::Ai;
            }
        }
        Self {
            slots: RwLock::new(slots),
            next_connection: AtomicU64::new(1),
            events: EventBus::default(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Entry>> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Entry>> {
        self.slots.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Give a new client the lowest free slot.
    pub fn register(
        &self,
        name: &str,
        tx: mpsc::Sender<String>,
    ) -> Result<Participant, &'static str> {
        let mut slots = self.write();
        let (index, slot) = slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| matches!(slot, Entry::Empty))
            .ok_or("server full")?;
        let id = u8::try_from(index).map_err(|_| "server full")?;
        let connection = self.next_connection.fetch_add(1, Ordering::Relaxed);
        let participant = Participant::new(ParticipantId(id), name).with_connection(connection);
        *slot = Entry::Client(Client {
            participant: participant.clone(),
            tx,
            admin: false,
        });
        Ok(participant)
    }

    /// Free the client's slot, then announce the disconnect. Ignored if the
    /// slot has already been handed to a newer connection.
    pub fn unregister(&self, participant: &Participant) -> bool {
        {
            let mut slots = self.write();
            let index = participant.id.index();
            let current = matches!(
                slots.get(index),
                Some(Entry::Client(client)) if client.participant.is_same_connection(participant)
            );
            if !current {
                return false;
            }
            slots[index] = Entry::Empty;
        }
        self.events
            .publish(Event::ParticipantDisconnected(participant.clone()));
        true
    }

    pub fn grant_admin(&self, participant: &Participant) -> bool {
        match self.write().get_mut(participant.id.index()) {
            Some(Entry::Client(client)) if client.participant.is_same_connection(participant) => {
                client.admin = true;
                true
            }
            _ => false,
        }
    }

    pub fn is_admin(&self, participant: &Participant) -> bool {
        match self.read().get(participant.id.index()) {
            Some(Entry::Client(client)) => {
                client.admin && client.participant.is_same_connection(participant)
            }
            _ => false,
        }
    }

    /// Relay a chat line from `from` to every client.
    pub fn broadcast_chat(&self, from: ParticipantId, message: &str) {
        self.fan_out(&ServerMessage::Chat {
            session_id: from.as_u8(),
            message: message.to_string(),
        });
    }

    /// Announce server shutdown to event subscribers.
    pub fn shutdown(&self) {
        self.events.publish(Event::Shutdown);
    }

    pub fn connected(&self) -> usize {
        self.read()
            .iter()
            .filter(|slot| matches!(slot, Entry::Client(_)))
            .count()
    }

    fn fan_out(&self, message: &ServerMessage) {
        let json = message.to_json();
        for slot in self.read().iter() {
            if let Entry::Client(client) = slot {
                deliver(client, json.clone());
            }
        }
    }
}

// Never blocks: a full or closed queue drops the frame.
fn deliver(client: &Client, json: String) {
    if let Err(e) = client.tx.try_send(json) {
        tracing::debug!(
            participant = %client.participant.id,
            error = %e,
            "Dropping outbound frame"
        );
    }
}

impl ConnectionRegistry for ClientRegistry {
    fn slot_count(&self) -> usize {
        self.read().len()
    }

    fn slot(&self, id: ParticipantId) -> Option<Slot> {
        self.read().get(id.index()).map(|entry| match entry {
            Entry::Ai => Slot::Ai,
            Entry::Empty => Slot::Empty,
            Entry::Client(client) => Slot::Occupied(client.participant.clone()),
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }
}

impl ChatSink for ClientRegistry {
    fn broadcast(&self, message: &str) {
        self.fan_out(&ServerMessage::Chat {
            session_id: SERVER_SESSION_ID,
            message: message.to_string(),
        });
    }

    fn send_to(&self, id: ParticipantId, message: &str) {
        if let Some(Entry::Client(client)) = self.read().get(id.index()) {
            let json = ServerMessage::Chat {
                session_id: SERVER_SESSION_ID,
                message: message.to_string(),
            }
            .to_json();
            deliver(client, json);
        }
    }
}
