//! Validates chat commands and routes them to the coordinator.

use std::sync::Arc;

use chase_common::{CommandError, ParticipantId};
use chase_config::PluginConfig;
use tracing::{debug, info, warn};

use crate::coordinator::SessionCoordinator;
use crate::protocol::ProtocolBroadcaster;
use crate::registry::{ConnectionRegistry, Slot};

use super::{AdminAction, Command, CommandContext};

pub struct CommandHandler {
    plugin: PluginConfig,
    coordinator: Arc<SessionCoordinator>,
    registry: Arc<dyn ConnectionRegistry>,
    replies: ProtocolBroadcaster,
}

impl CommandHandler {
    pub fn new(
        plugin: PluginConfig,
        coordinator: Arc<SessionCoordinator>,
        registry: Arc<dyn ConnectionRegistry>,
        replies: ProtocolBroadcaster,
    ) -> Self {
        Self {
            plugin,
            coordinator,
            registry,
            replies,
        }
    }

    /// Parse and run one chat line.
    ///
    /// Returns `true` if the line was a chase command (whether or not it
    /// succeeded). Rejections are sent back to the caller as a notice.
    pub fn dispatch(&self, ctx: &CommandContext, line: &str) -> bool {
        let command = match Command::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return false,
            Err(e) => {
                self.replies.reply(ctx.caller.id, &e.to_string());
                return true;
            }
        };

        if let Err(e) = self.handle(ctx, command) {
            debug!(caller = %ctx.caller.id, error = %e, "Chase command rejected");
            self.replies.reply(ctx.caller.id, &e.to_string());
        }
        true
    }

    pub fn handle(&self, ctx: &CommandContext, command: Command) -> Result<(), CommandError> {
        if !self.plugin.enabled {
            return Err(CommandError::Disabled);
        }
        if command.requires_privilege() && !ctx.privileged {
            warn!(caller = %ctx.caller.name, ?command, "Unprivileged admin command");
            return Err(CommandError::PermissionDenied);
        }

        match command {
            Command::Chase { target } => self.chase(ctx, target),
            Command::ChaseReport { result } => {
                self.coordinator.report_result(&ctx.caller, &result);
                Ok(())
            }
            Command::ChaseCmd(action) => self.admin(ctx, action),
            Command::ChaseReset => {
                self.coordinator.reset();
                Ok(())
            }
        }
    }

    fn chase(&self, ctx: &CommandContext, target: i64) -> Result<(), CommandError> {
        let caller = &ctx.caller;
        let target_id = u8::try_from(target)
            .ok()
            .map(ParticipantId)
            .filter(|id| id.index() < self.registry.slot_count())
            .ok_or(CommandError::InvalidTarget)?;
        let slot = self
            .registry
            .slot(target_id)
            .ok_or(CommandError::InvalidTarget)?;

        if self.plugin.debug_mode {
            info!(caller = %caller.name, target = %target_id, ?slot, "Chase request");
        } else {
            debug!(caller = %caller.name, target = %target_id, ?slot, "Chase request");
        }

        let target = match slot {
            Slot::Ai => return Err(CommandError::AiTarget),
            Slot::Empty => return Err(CommandError::TargetNotConnected(target_id)),
            Slot::Occupied(p) => p,
        };
        if target == *caller {
            return Err(CommandError::SelfTarget);
        }

        // The target leads; the caller gives chase.
        if self.coordinator.try_start_battle(target, caller.clone()) {
            Ok(())
        } else {
            Err(CommandError::Busy)
        }
    }

    fn admin(&self, ctx: &CommandContext, action: AdminAction) -> Result<(), CommandError> {
        info!(caller = %ctx.caller.name, ?action, "Chase admin command");
        match action {
            AdminAction::SetRoles(payload) => {
                let (leader_id, chaser_id) = parse_roles(&payload)?;
                let (Some(leader), Some(chaser)) = (
                    self.registry.participant(leader_id),
                    self.registry.participant(chaser_id),
                ) else {
                    return Err(CommandError::UnknownDrivers);
                };
                let notice = format!("Roles set: Leader={}, Chaser={}", leader.name, chaser.name);
                if !self.coordinator.set_contestants(leader, chaser) {
                    return Err(CommandError::MalformedPayload(
                        "leader and chaser must differ".into(),
                    ));
                }
                self.replies.reply(ctx.caller.id, &notice);
            }
            AdminAction::Start => self.coordinator.start_battle(),
            AdminAction::Stop => self.coordinator.reset(),
            AdminAction::Status => {
                for line in self.status_lines() {
                    self.replies.reply(ctx.caller.id, &line);
                }
            }
            AdminAction::Unknown(name) => {
                return Err(CommandError::UnknownCommand(format!("chase_cmd {name}")));
            }
        }
        Ok(())
    }

    fn status_lines(&self) -> Vec<String> {
        let snapshot = self.coordinator.snapshot();
        let mut lines = vec![format!(
            "Chase phase: {:?}, active battles: {}",
            snapshot.phase,
            snapshot.battles.len()
        )];
        if let (Some(leader), Some(chaser)) = (&snapshot.pending_leader, &snapshot.pending_chaser) {
            lines.push(format!("Pending: {} -> {}", leader.name, chaser.name));
        }
        for battle in &snapshot.battles {
            lines.push(format!(
                "{} ({}) -> {} ({}), started {}",
                battle.leader.name,
                battle.leader.id,
                battle.chaser.name,
                battle.chaser.id,
                battle.started_at.to_rfc3339()
            ));
        }
        lines
    }
}

fn parse_roles(payload: &str) -> Result<(ParticipantId, ParticipantId), CommandError> {
    let malformed = || {
        CommandError::MalformedPayload(format!("expected <leaderId>,<chaserId>, got {payload:?}"))
    };
    let (leader, chaser) = payload.split_once(',').ok_or_else(malformed)?;
    let leader = leader.parse().map_err(|_| malformed())?;
    let chaser = chaser.parse().map_err(|_| malformed())?;
    Ok((leader, chaser))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeRegistry, RecordingSink};
    use chase_common::Participant;

    struct Harness {
        registry: Arc<FakeRegistry>,
        sink: Arc<RecordingSink>,
        coordinator: Arc<SessionCoordinator>,
        handler: CommandHandler,
    }

    impl Harness {
        fn with_plugin(plugin: PluginConfig) -> Self {
            let registry = Arc::new(FakeRegistry::new(6));
            let sink = Arc::new(RecordingSink::default());
            let coordinator = Arc::new(SessionCoordinator::new(registry.clone(), sink.clone()));
            let handler = CommandHandler::new(
                plugin,
                coordinator.clone(),
                registry.clone(),
                ProtocolBroadcaster::new(sink.clone()),
            );
            Self {
                registry,
                sink,
                coordinator,
                handler,
            }
        }

        fn new() -> Self {
            Self::with_plugin(PluginConfig::default())
        }

        fn join(&self, id: u8, name: &str) -> Participant {
            self.registry.connect(ParticipantId(id), name)
        }

        fn run(&self, caller: &Participant, line: &str) -> bool {
            self.handler
                .dispatch(&CommandContext::player(caller.clone()), line)
        }

        fn run_admin(&self, caller: &Participant, line: &str) -> bool {
            self.handler
                .dispatch(&CommandContext::admin(caller.clone()), line)
        }
    }

    #[test]
    fn chase_starts_battle_with_target_leading() {
        let h = Harness::new();
        let alice = h.join(0, "alice");
        let bob = h.join(1, "bob");

        assert!(h.run(&bob, "/chase 0"));

        let battle = h.coordinator.battle_for(ParticipantId(0)).unwrap();
        assert_eq!(battle.leader, alice);
        assert_eq!(battle.chaser, bob);
        assert!(h.sink.direct_to(bob.id).is_empty());
    }

    #[test]
    fn chase_rejects_bad_targets() {
        let h = Harness::new();
        let bob = h.join(1, "bob");
        h.registry.set_ai(ParticipantId(5));

        h.run(&bob, "/chase -1");
        h.run(&bob, "/chase 6");
        h.run(&bob, "/chase 999");
        h.run(&bob, "/chase 5");
        h.run(&bob, "/chase 2");
        h.run(&bob, "/chase 1");

        assert_eq!(
            h.sink.direct_to(bob.id),
            vec![
                "Invalid target ID.",
                "Invalid target ID.",
                "Invalid target ID.",
                "Cannot chase AI cars.",
                "Target is not connected (ID: 2).",
                "You cannot chase yourself.",
            ]
        );
        assert_eq!(h.coordinator.battle_count(), 0);
    }

    #[test]
    fn chase_reports_busy_players() {
        let h = Harness::new();
        let _alice = h.join(0, "alice");
        let bob = h.join(1, "bob");
        let carol = h.join(2, "carol");

        h.run(&bob, "/chase 0");
        h.run(&carol, "/chase 0");

        assert_eq!(
            h.sink.direct_to(carol.id),
            vec!["Could not start chase (players busy?)."]
        );
    }

    #[test]
    fn chasereport_resolves_callers_battle() {
        let h = Harness::new();
        let _alice = h.join(0, "alice");
        let bob = h.join(1, "bob");
        h.run(&bob, "/chase 0");

        h.run(&bob, "/chasereport WIN");

        assert_eq!(h.coordinator.battle_count(), 0);
        assert!(h.sink.contains("CHASE_BATTLE:RESULT:WIN"));
    }

    #[test]
    fn plain_chat_is_not_consumed() {
        let h = Harness::new();
        let bob = h.join(1, "bob");
        assert!(!h.run(&bob, "gg"));
        assert!(!h.run(&bob, "/admin hunter2"));
        assert!(h.sink.sent().is_empty());
    }

    #[test]
    fn admin_commands_need_privilege() {
        let h = Harness::new();
        let bob = h.join(1, "bob");

        h.run(&bob, "/chase_reset");
        h.run(&bob, "/chase_cmd STOP");

        assert_eq!(
            h.sink.direct_to(bob.id),
            vec![
                "You do not have permission to use this command.",
                "You do not have permission to use this command.",
            ]
        );
        assert!(!h.sink.contains("STATE:0"));
    }

    #[test]
    fn admin_set_roles_then_start() {
        let h = Harness::new();
        let admin = h.join(0, "admin");
        let alice = h.join(1, "alice");
        let bob = h.join(2, "bob");

        h.run_admin(&admin, "/chase_cmd SET_ROLES 1,2");
        assert_eq!(
            h.sink.direct_to(admin.id),
            vec!["Roles set: Leader=alice, Chaser=bob"]
        );
        assert_eq!(h.coordinator.battle_count(), 0);

        h.run_admin(&admin, "/chase_cmd START");
        let battle = h.coordinator.battle_for(alice.id).unwrap();
        assert_eq!(battle.chaser, bob);
        assert_eq!(
            h.sink.protocol_lines(),
            vec!["CHASE_BATTLE:SETUP:1,2", "CHASE_BATTLE:START:"]
        );
    }

    #[test]
    fn admin_set_roles_rejects_bad_payloads() {
        let h = Harness::new();
        let admin = h.join(0, "admin");
        h.join(1, "alice");

        h.run_admin(&admin, "/chase_cmd SET_ROLES 1");
        h.run_admin(&admin, "/chase_cmd SET_ROLES x,y");
        h.run_admin(&admin, "/chase_cmd SET_ROLES 1,4");
        h.run_admin(&admin, "/chase_cmd SET_ROLES 1,1");

        let replies = h.sink.direct_to(admin.id);
        assert_eq!(replies.len(), 4);
        assert!(replies[0].starts_with("Malformed payload"));
        assert!(replies[1].starts_with("Malformed payload"));
        assert_eq!(replies[2], "Could not find one or both drivers.");
        assert_eq!(replies[3], "Malformed payload: leader and chaser must differ");
        assert!(h.coordinator.snapshot().is_idle());
    }

    #[test]
    fn admin_stop_and_reset_clear_state() {
        let h = Harness::new();
        let admin = h.join(0, "admin");
        let _alice = h.join(1, "alice");
        let bob = h.join(2, "bob");
        h.run(&bob, "/chase 1");

        h.run_admin(&admin, "/chase_cmd STOP");
        assert!(h.coordinator.snapshot().is_idle());

        h.run(&bob, "/chase 1");
        h.run_admin(&admin, "/chase_reset");
        assert!(h.coordinator.snapshot().is_idle());
        assert_eq!(
            h.sink
                .protocol_lines()
                .iter()
                .filter(|l| *l == "CHASE_BATTLE:STATE:0")
                .count(),
            2
        );
    }

    #[test]
    fn admin_status_lists_battles() {
        let h = Harness::new();
        let admin = h.join(0, "admin");
        let _alice = h.join(1, "alice");
        let bob = h.join(2, "bob");
        h.run(&bob, "/chase 1");

        h.run_admin(&admin, "/chase_cmd STATUS");

        let replies = h.sink.direct_to(admin.id);
        assert_eq!(replies[0], "Chase phase: Active, active battles: 1");
        assert_eq!(replies[1], "Pending: alice -> bob");
        assert!(replies[2].starts_with("alice (1) -> bob (2), started "));
    }

    #[test]
    fn admin_unknown_action_is_reported() {
        let h = Harness::new();
        let admin = h.join(0, "admin");
        h.run_admin(&admin, "/chase_cmd PAUSE");
        assert_eq!(
            h.sink.direct_to(admin.id),
            vec!["Unknown command: chase_cmd PAUSE"]
        );
    }

    #[test]
    fn disabled_plugin_rejects_everything() {
        let h = Harness::with_plugin(PluginConfig {
            enabled: false,
            debug_mode: false,
        });
        let admin = h.join(0, "admin");
        let _alice = h.join(1, "alice");

        assert!(h.run_admin(&admin, "/chase 1"));
        h.run_admin(&admin, "/chase_reset");

        assert_eq!(
            h.sink.direct_to(admin.id),
            vec!["Chase battles are disabled.", "Chase battles are disabled."]
        );
        assert!(h.sink.protocol_lines().is_empty());
    }
}
