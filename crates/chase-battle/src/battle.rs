//! The battle record: one leader, one chaser, one start time.

use chase_common::{Participant, ParticipantId};
use chrono::{DateTime, Utc};

/// Which side of a battle a participant is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Pursued.
    Leader,
    /// Pursuer.
    Chaser,
}

/// An active pursuit. Immutable once created; keyed by the leader's id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Battle {
    pub leader: Participant,
    pub chaser: Participant,
    pub started_at: DateTime<Utc>,
}

impl Battle {
    pub fn new(leader: Participant, chaser: Participant) -> Self {
        Self::started_at(leader, chaser, Utc::now())
    }

    pub fn started_at(leader: Participant, chaser: Participant, started_at: DateTime<Utc>) -> Self {
        Self {
            leader,
            chaser,
            started_at,
        }
    }

    pub fn key(&self) -> ParticipantId {
        self.leader.id
    }

    pub fn involves(&self, id: ParticipantId) -> bool {
        self.leader.id == id || self.chaser.id == id
    }

    pub fn role_of(&self, id: ParticipantId) -> Option<Role> {
        if self.leader.id == id {
            Some(Role::Leader)
        } else if self.chaser.id == id {
            Some(Role::Chaser)
        } else {
            None
        }
    }

    /// Whether this exact connection is one of the two sides.
    pub fn includes(&self, participant: &Participant) -> bool {
        self.leader.is_same_connection(participant)
            || self.chaser.is_same_connection(participant)
    }

    /// The side facing `participant`. Assumes [`Self::includes`] holds.
    pub fn opponent_of(&self, participant: &Participant) -> &Participant {
        match self.role_of(participant.id) {
            Some(Role::Leader) => &self.chaser,
            _ => &self.leader,
        }
    }

    /// Time since the battle started. Zero if the clock went backwards.
    pub fn age(&self, now: DateTime<Utc>) -> std::time::Duration {
        now.signed_duration_since(self.started_at)
            .to_std()
            .unwrap_or_default()
    }
}
