//! Validation for the `[server]` section.

use std::collections::HashSet;

use chase_common::SERVER_SESSION_ID;

use crate::schema::ChaseConfig;

use super::helpers::validate_range;

pub(crate) fn validate_server(errors: &mut Vec<String>, config: &ChaseConfig) {
    let server = &config.server;

    if server.bind.trim().is_empty() {
        errors.push("server.bind must not be empty".into());
    }
    validate_range(errors, "server.port", server.port, 1, 65535);
    // Slot ids must stay below the id the server itself chats with.
    validate_range(
        errors,
        "server.max_slots",
        server.max_slots,
        1,
        u32::from(SERVER_SESSION_ID),
    );
    validate_range(
        errors,
        "server.hello_timeout_secs",
        server.hello_timeout_secs,
        1,
        120,
    );
    validate_range(errors, "server.client_queue", server.client_queue, 8, 4096);

    let mut seen = HashSet::new();
    for &slot in &server.ai_slots {
        if slot >= server.max_slots {
            errors.push(format!(
                "server.ai_slots entry {slot} is not below max_slots ({})",
                server.max_slots
            ));
        }
        if !seen.insert(slot) {
            errors.push(format!("server.ai_slots entry {slot} is duplicated"));
        }
    }
    if !server.ai_slots.is_empty() && seen.len() as u32 >= server.max_slots {
        errors.push("server.ai_slots leaves no slot for players".into());
    }
}
