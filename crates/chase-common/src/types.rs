use serde::{Deserialize, Serialize};

use crate::id::ParticipantId;

/// Snapshot of a connected player as seen by the chase plugin.
///
/// Equality is by id only. `connection` distinguishes two clients that held
/// the same slot one after the other; the registry bumps it on every new
/// connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    #[serde(default)]
    pub connection: u64,
}

impl Participant {
    pub fn new(id: ParticipantId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            connection: 0,
        }
    }

    pub fn with_connection(mut self, connection: u64) -> Self {
        self.connection = connection;
        self
    }

    /// Same slot and same connection.
    pub fn is_same_connection(&self, other: &Participant) -> bool {
        self.id == other.id && self.connection == other.connection
    }
}

impl PartialEq for Participant {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Participant {}
