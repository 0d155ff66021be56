use serde::{Deserialize, Serialize};

/// Battle lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Expire battles that never report a result after this many seconds.
    /// `0` keeps them until an admin reset (valid range otherwise: 30-86400).
    pub timeout_secs: u32,
    /// How often the expiry reaper runs (valid range: 1-3600).
    pub reap_interval_secs: u32,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 0,
            reap_interval_secs: 30,
        }
    }
}

impl BattleConfig {
    pub fn expiry_enabled(&self) -> bool {
        self.timeout_secs > 0
    }
}
