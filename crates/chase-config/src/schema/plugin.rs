use serde::{Deserialize, Serialize};

/// Chase plugin switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// When false the chase commands answer with a "disabled" notice.
    pub enabled: bool,
    /// Log chase-request diagnostics at info instead of debug.
    pub debug_mode: bool,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debug_mode: false,
        }
    }
}
