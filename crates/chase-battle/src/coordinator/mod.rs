//! Battle session coordinator.
//!
//! The single authority over battle state. Every operation runs its whole
//! check-and-mutate sequence, including the broadcasts it emits, inside one
//! critical section. A result report racing a disconnect for the same battle
//! therefore resolves it exactly once, and broadcasts from different
//! operations never interleave.
//!
//! Participants are matched by connection, not just by slot id: a client
//! that takes over a freed slot never inherits the previous holder's battle.
//!
//! Starting a battle clears every other tracked battle: at most one battle
//! is live at a time even though the map is keyed per leader.

mod state;


use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chase_common::{Participant, ParticipantId};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::battle::Battle;
use crate::outcome::Outcome;
use crate::protocol::{ProtocolBroadcaster, ProtocolMessage};
use crate::registry::{ChatSink, ConnectionRegistry};

pub use state::{CoordinatorSnapshot, Phase};
use state::CoordinatorState;

pub struct SessionCoordinator {
    state: Mutex<CoordinatorState>,
    registry: Arc<dyn ConnectionRegistry>,
    broadcaster: ProtocolBroadcaster,
}

impl SessionCoordinator {
    pub fn new(registry: Arc<dyn ConnectionRegistry>, sink: Arc<dyn ChatSink>) -> Self {
        Self {
            state: Mutex::new(CoordinatorState::default()),
            registry,
            broadcaster: ProtocolBroadcaster::new(sink),
        }
    }

    // A panic mid-operation leaves the state as it was at the panic; keep going.
    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pair `leader` and `chaser` and start immediately.
    ///
    /// Fails without touching state if they are the same participant, if
    /// either one is no longer connected, or if either one is already in an
    /// active battle, in either role.
    pub fn try_start_battle(&self, leader: Participant, chaser: Participant) -> bool {
        let mut state = self.lock();
        self.try_start_locked(&mut state, leader, chaser)
    }

    /// Admin override: set the pending pair without exclusivity checks.
    ///
    /// Returns false (no change) only when both sides are the same
    /// participant. Does not create a battle; see [`Self::start_battle`].
    pub fn set_contestants(&self, leader: Participant, chaser: Participant) -> bool {
        if leader == chaser {
            debug!(participant = %leader.id, "Refusing to pair a participant with itself");
            return false;
        }
        let mut state = self.lock();
        self.set_contestants_locked(&mut state, leader, chaser);
        true
    }

    /// Start the pending pair, replacing any tracked battle. No-op without
    /// a pending pair.
    pub fn start_battle(&self) {
        let mut state = self.lock();
        self.start_locked(&mut state);
    }

    /// Resolve the battle `reporter` is part of. No-op if there is none.
    pub fn report_result(&self, reporter: &Participant, result: &str) {
        let mut state = self.lock();

        let Some(battle) = state.take_battle_of(reporter) else {
            debug!(reporter = %reporter.id, result, "Result for no tracked battle");
            return;
        };
        state.phase = Phase::Idle;

        match Outcome::parse(result) {
            Outcome::Draw => {
                info!(leader = %battle.leader.name, chaser = %battle.chaser.name, "Chase draw");
                self.broadcaster
                    .notice("Chase Result: DRAW! Swapping roles...");
                self.broadcaster
                    .protocol(&ProtocolMessage::Result(Outcome::Draw));

                let Battle { leader, chaser, .. } = battle;
                if !self.try_start_locked(&mut state, chaser, leader) {
                    self.broadcaster.notice("Could not auto-start swap battle.");
                }
            }
            Outcome::GiveUp => {
                let winner = battle.opponent_of(reporter);
                info!(quitter = %reporter.name, winner = %winner.name, "Chase forfeit");
                self.broadcaster.notice(&format!(
                    "Chase Result: {} WON! ({} gave up)",
                    winner.name, reporter.name
                ));
                self.broadcaster
                    .protocol(&ProtocolMessage::Result(Outcome::GiveUp));
            }
            outcome => {
                let Battle { leader, chaser, .. } = &battle;
                let message = if outcome == Outcome::Win {
                    format!("Chase Result: {} CAUGHT {}!", chaser.name, leader.name)
                } else {
                    format!("Chase Result: {} ESCAPED from {}!", leader.name, chaser.name)
                };
                info!(outcome = %outcome, "Chase ended: {message}");
                self.broadcaster.notice(&message);
                self.broadcaster.protocol(&ProtocolMessage::Result(outcome));
            }
        }
    }

    /// Drop every battle and the pending pair.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.clear();
        info!("Chase coordinator reset by admin");
        self.broadcaster
            .notice("Chase Battle System has been RESET by Admin.");
        self.broadcaster
            .protocol(&ProtocolMessage::State(Phase::Idle.code()));
    }

    /// Disconnect hook. Ends the participant's battle as a forfeit and tells
    /// the opponent, if they are still connected. Never fails.
    ///
    /// Only the exact connection that left is matched; a newer client in the
    /// same slot is left alone.
    pub fn on_participant_disconnected(&self, gone: &Participant) {
        let mut state = self.lock();

        // A stale pending pair would let an admin START a ghost.
        if state.is_pending(gone) {
            clear_pending(&mut state);
        }

        let Some(battle) = state.take_battle_of(gone) else {
            debug!(participant = %gone.id, "Disconnect outside any battle");
            return;
        };
        if state.active_battles.is_empty() {
            state.phase = Phase::Idle;
        }
        self.forfeit(&battle, gone);
    }

    /// Resolve every battle with a side that is no longer connected, as if
    /// its disconnect had been delivered. Used when disconnect events were
    /// missed. Returns how many battles were removed.
    pub fn reconcile(&self) -> usize {
        let mut state = self.lock();

        let departed = |p: &Participant| !self.registry.is_connected(p);
        if [&state.pending_leader, &state.pending_chaser]
            .into_iter()
            .flatten()
            .any(departed)
        {
            clear_pending(&mut state);
        }

        let stale: Vec<ParticipantId> = state
            .active_battles
            .values()
            .filter(|b| departed(&b.leader) || departed(&b.chaser))
            .map(Battle::key)
            .collect();

        for key in &stale {
            let Some(battle) = state.active_battles.remove(key) else {
                continue;
            };
            let gone = if departed(&battle.leader) {
                battle.leader.clone()
            } else {
                battle.chaser.clone()
            };
            self.forfeit(&battle, &gone);
        }

        if !stale.is_empty() && state.active_battles.is_empty() {
            state.phase = Phase::Idle;
        }
        stale.len()
    }

    /// Remove battles older than `max_age`. Returns how many were removed.
    pub fn expire_stale(&self, max_age: Duration) -> usize {
        self.expire_stale_at(max_age, Utc::now())
    }

    pub(crate) fn expire_stale_at(&self, max_age: Duration, now: DateTime<Utc>) -> usize {
        let mut state = self.lock();

        let stale: Vec<ParticipantId> = state
            .active_battles
            .values()
            .filter(|b| b.age(now) >= max_age)
            .map(Battle::key)
            .collect();

        for key in &stale {
            let Some(battle) = state.active_battles.remove(key) else {
                continue;
            };
            info!(
                leader = %battle.leader.name,
                chaser = %battle.chaser.name,
                "Expiring chase battle with no result"
            );
            self.broadcaster.notice(&format!(
                "Chase Battle expired: {} vs {} (no result reported).",
                battle.leader.name, battle.chaser.name
            ));
            let end = ProtocolMessage::ChaseEnd {
                leader: battle.leader.id,
            };
            for side in [&battle.leader, &battle.chaser] {
                if self.registry.is_connected(side) {
                    self.broadcaster.direct(side.id, &end);
                }
            }
        }

        if !stale.is_empty() && state.active_battles.is_empty() {
            state.phase = Phase::Idle;
        }
        stale.len()
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    pub fn battle_count(&self) -> usize {
        self.lock().active_battles.len()
    }

    /// The battle the participant in slot `id` is part of, if any.
    pub fn battle_for(&self, id: ParticipantId) -> Option<Battle> {
        self.lock().battle_involving(id).cloned()
    }

    pub fn snapshot(&self) -> CoordinatorSnapshot {
        self.lock().snapshot()
    }

    // Caller holds the lock and has already removed `battle` from the map.
    fn forfeit(&self, battle: &Battle, gone: &Participant) {
        let other = battle.opponent_of(gone);
        info!(participant = %gone.name, "Chase battle ended: participant disconnected");

        if self.registry.is_connected(other) {
            self.broadcaster.notice(&format!(
                "Chase Result: {} WON! (Opponent Disconnected)",
                other.name
            ));
            self.broadcaster.direct(
                other.id,
                &ProtocolMessage::ChaseEnd {
                    leader: battle.leader.id,
                },
            );
        }
    }

    fn try_start_locked(
        &self,
        state: &mut CoordinatorState,
        leader: Participant,
        chaser: Participant,
    ) -> bool {
        if leader == chaser {
            debug!(participant = %leader.id, "Self-chase rejected");
            return false;
        }
        // Checked under the lock: a side that left after the caller looked it
        // up must not end up in a battle nobody will resolve.
        if !self.registry.is_connected(&leader) || !self.registry.is_connected(&chaser) {
            debug!(leader = %leader.id, chaser = %chaser.id, "Chase rejected: participant gone");
            return false;
        }
        if state.is_engaged(&leader) || state.is_engaged(&chaser) {
            debug!(leader = %leader.id, chaser = %chaser.id, "Chase rejected: participant busy");
            return false;
        }

        self.set_contestants_locked(state, leader, chaser);
        self.start_locked(state);
        true
    }

    fn set_contestants_locked(
        &self,
        state: &mut CoordinatorState,
        leader: Participant,
        chaser: Participant,
    ) {
        info!(leader = %leader.name, chaser = %chaser.name, "Chase contestants set");
        self.broadcaster.protocol(&ProtocolMessage::Setup {
            leader: leader.id,
            chaser: chaser.id,
        });
        state.pending_leader = Some(leader);
        state.pending_chaser = Some(chaser);
        state.phase = Phase::Setup;
    }

    fn start_locked(&self, state: &mut CoordinatorState) {
        let (Some(leader), Some(chaser)) = (&state.pending_leader, &state.pending_chaser) else {
            debug!("Start requested without contestants");
            return;
        };
        let battle = Battle::new(leader.clone(), chaser.clone());

        state.phase = Phase::Active;
        self.broadcaster.protocol(&ProtocolMessage::Start);

        state.active_battles.clear();
        info!(leader = %battle.leader.name, chaser = %battle.chaser.name, "Chase battle started");
        state.active_battles.insert(battle.key(), battle);
    }
}

fn clear_pending(state: &mut CoordinatorState) {
    state.pending_leader = None;
    state.pending_chaser = None;
    if state.phase == Phase::Setup {
        state.phase = Phase::Idle;
    }
}
