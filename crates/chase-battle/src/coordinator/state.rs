//! State owned by the session coordinator.

use std::collections::HashMap;

use chase_common::{Participant, ParticipantId};

use crate::battle::Battle;

/// Coarse lifecycle marker for the most recently initiated pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Setup,
    Active,
    Finished,
}

impl Phase {
    /// Numeric code used by the `STATE` protocol message.
    pub fn code(self) -> u8 {
        match self {
            Phase::Idle => 0,
            Phase::Setup => 1,
            Phase::Active => 2,
            Phase::Finished => 3,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct CoordinatorState {
    /// Keyed by leader id.
    pub active_battles: HashMap<ParticipantId, Battle>,
    pub pending_leader: Option<Participant>,
    pub pending_chaser: Option<Participant>,
    pub phase: Phase,
}

impl CoordinatorState {
    pub fn battle_involving(&self, id: ParticipantId) -> Option<&Battle> {
        self.active_battles.values().find(|b| b.involves(id))
    }

    /// The battle this exact connection is part of.
    pub fn battle_of(&self, participant: &Participant) -> Option<&Battle> {
        self.active_battles.values().find(|b| b.includes(participant))
    }

    pub fn is_engaged(&self, participant: &Participant) -> bool {
        self.battle_of(participant).is_some()
    }

    pub fn take_battle_of(&mut self, participant: &Participant) -> Option<Battle> {
        let key = self.battle_of(participant)?.key();
        self.active_battles.remove(&key)
    }

    /// Whether the pending pair names this exact connection.
    pub fn is_pending(&self, participant: &Participant) -> bool {
        [&self.pending_leader, &self.pending_chaser]
            .into_iter()
            .flatten()
            .any(|p| p.is_same_connection(participant))
    }

    pub fn clear(&mut self) {
        *self = CoordinatorState::default();
    }

    pub fn snapshot(&self) -> CoordinatorSnapshot {
        let mut battles: Vec<Battle> = self.active_battles.values().cloned().collect();
        battles.sort_by_key(|b| b.started_at);
        CoordinatorSnapshot {
            phase: self.phase,
            pending_leader: self.pending_leader.clone(),
            pending_chaser: self.pending_chaser.clone(),
            battles,
        }
    }
}

/// Point-in-time copy of coordinator state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorSnapshot {
    pub phase: Phase,
    pub pending_leader: Option<Participant>,
    pub pending_chaser: Option<Participant>,
    /// Oldest first.
    pub battles: Vec<Battle>,
}

impl CoordinatorSnapshot {
    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
            && self.battles.is_empty()
            && self.pending_leader.is_none()
            && self.pending_chaser.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(id: u8) -> Participant {
        Participant::new(ParticipantId(id), format!("p{id}"))
    }

    #[test]
    fn phase_codes() {
        assert_eq!(Phase::Idle.code(), 0);
        assert_eq!(Phase::Setup.code(), 1);
        assert_eq!(Phase::Active.code(), 2);
        assert_eq!(Phase::Finished.code(), 3);
    }

    #[test]
    fn take_battle_by_either_participant() {
        let mut state = CoordinatorState::default();
        state
            .active_battles
            .insert(ParticipantId(1), Battle::new(p(1), p(2)));

        assert!(state.is_engaged(&p(2)));
        let taken = state.take_battle_of(&p(2)).unwrap();
        assert_eq!(taken.leader.id, ParticipantId(1));
        assert!(state.active_battles.is_empty());
        assert!(state.take_battle_of(&p(1)).is_none());
    }

    #[test]
    fn newer_connection_in_same_slot_is_not_engaged() {
        let mut state = CoordinatorState::default();
        state
            .active_battles
            .insert(ParticipantId(1), Battle::new(p(1), p(2)));
        state.pending_leader = Some(p(1));

        let newcomer = p(2).with_connection(5);
        assert!(!state.is_engaged(&newcomer));
        assert!(state.take_battle_of(&newcomer).is_none());
        assert!(state.battle_involving(newcomer.id).is_some());
        assert!(state.is_pending(&p(1)));
        assert!(!state.is_pending(&p(1).with_connection(5)));
    }

    #[test]
    fn clear_returns_to_initial_state() {
        let mut state = CoordinatorState::default();
        state.pending_leader = Some(p(1));
        state.pending_chaser = Some(p(2));
        state.phase = Phase::Active;
        state
            .active_battles
            .insert(ParticipantId(1), Battle::new(p(1), p(2)));

        state.clear();
        assert!(state.snapshot().is_idle());
    }
}
