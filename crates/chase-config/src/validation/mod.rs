//! Full configuration validation.
//!
//! Each section has its own validator; this orchestrator calls them all
//! and collects errors into a single `ConfigError`.

mod battle;
mod helpers;
mod server;


use crate::schema::ChaseConfig;
use chase_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &ChaseConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    server::validate_server(&mut errors, config);
    battle::validate_battle(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
