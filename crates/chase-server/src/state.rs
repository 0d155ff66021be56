//! State shared by every connection task, and chat routing.

use std::sync::Arc;
use std::time::Duration;

use chase_battle::{ChatSink, CommandContext, CommandHandler};
use chase_common::Participant;
use chase_config::ChaseConfig;

use crate::registry::ClientRegistry;

pub struct ServerState {
    pub registry: Arc<ClientRegistry>,
    pub commands: Arc<CommandHandler>,
    pub hello_timeout: Duration,
    pub client_queue: usize,
    admin_password: String,
}

impl ServerState {
    pub fn new(
        config: &ChaseConfig,
        registry: Arc<ClientRegistry>,
        commands: Arc<CommandHandler>,
    ) -> Self {
        Self {
            registry,
            commands,
            hello_timeout: Duration::from_secs(config.server.hello_timeout_secs.into()),
            client_queue: config.server.client_queue as usize,
            admin_password: config.admin.password.clone(),
        }
    }

    /// Route one chat line from a connected client.
    ///
    /// `/admin` is handled here, chase commands go to the command layer,
    /// and anything else is relayed to everyone as `<name>: <text>`.
    pub fn on_chat(&self, participant: &Participant, message: &str) {
        let message = message.trim();
        if message.is_empty() {
            return;
        }

        if let Some(password) = admin_login(message) {
            self.login(participant, password);
            return;
        }

        let ctx = CommandContext {
            caller: participant.clone(),
            privileged: self.registry.is_admin(participant),
        };
        if self.commands.dispatch(&ctx, message) {
            return;
        }

        self.registry
            .broadcast_chat(participant.id, &format!("{}: {}", participant.name, message));
    }

    fn login(&self, participant: &Participant, password: &str) {
        let reply = if self.admin_password.is_empty() {
            "Admin login is disabled."
        } else if password == self.admin_password {
            self.registry.grant_admin(participant);
            tracing::info!(
                participant = %participant.name,
                id = %participant.id,
                "Admin login"
            );
            "Admin access granted."
        } else {
            tracing::warn!(
                participant = %participant.name,
                id = %participant.id,
                "Failed admin login"
            );
            "Invalid admin password."
        };
        self.registry.send_to(participant.id, reply);
    }
}

/// The password of an `/admin <password>` line.
fn admin_login(message: &str) -> Option<&str> {
    let rest = message.strip_prefix("/admin")?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim())
}
