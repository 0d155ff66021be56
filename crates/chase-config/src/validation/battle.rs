//! Validation for the `[battle]` section.

use crate::schema::ChaseConfig;

use super::helpers::validate_range;

pub(crate) fn validate_battle(errors: &mut Vec<String>, config: &ChaseConfig) {
    let battle = &config.battle;

    if battle.expiry_enabled() {
        validate_range(errors, "battle.timeout_secs", battle.timeout_secs, 30, 86400);
    }
    validate_range(
        errors,
        "battle.reap_interval_secs",
        battle.reap_interval_secs,
        1,
        3600,
    );
}
