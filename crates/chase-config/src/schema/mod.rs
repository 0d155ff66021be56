//! Configuration schema types for the chase battle server.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod battle;
mod plugin;
mod server;
mod system;

pub use battle::*;
pub use plugin::*;
pub use server::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration.
///
/// Only override what you want to change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct ChaseConfig {
    pub plugin: PluginConfig,
    pub server: ServerConfig,
    pub battle: BattleConfig,
    pub admin: AdminConfig,
    pub logging: LoggingConfig,
}
