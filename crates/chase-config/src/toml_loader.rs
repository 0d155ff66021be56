//! TOML config file loading and creation.

use crate::schema::ChaseConfig;
use crate::validation;
use chase_common::ConfigError;
use std::path::Path;
use tracing::{info, warn};

/// Load config from a specific TOML file path.
///
/// Deserializes the file using serde defaults for any missing fields.
/// If validation fails, a warning is logged and the default config is
/// returned.
pub fn load_from_path(path: &Path) -> Result<ChaseConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::ParseError(format!("failed to read {}: {e}", path.display()))
    })?;

    let config: ChaseConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    if let Err(e) = validation::validate(&config) {
        warn!("Config validation warning: {e}");
        warn!("Falling back to default config");
        return Ok(ChaseConfig::default());
    }

    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Load config from the platform-specific default path.
///
/// On Linux: `~/.config/chase-battle/config.toml`
///
/// If the file does not exist, creates a default config file and returns defaults.
pub fn load_default() -> Result<ChaseConfig, ConfigError> {
    let path = default_config_path()?;

    if !path.exists() {
        info!("No config found at {}, creating default", path.display());
        create_default_config(&path)?;
        return Ok(ChaseConfig::default());
    }

    load_from_path(&path)
}

/// Get the platform-specific default config file path.
pub fn default_config_path() -> Result<std::path::PathBuf, ConfigError> {
    let config_dir = dirs::config_dir().ok_or_else(|| {
        ConfigError::ParseError("could not determine config directory".into())
    })?;
    Ok(config_dir.join("chase-battle").join("config.toml"))
}

/// Create a default TOML config file with documentation comments.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ConfigError::ParseError(format!(
                "failed to create config directory {}: {e}",
                parent.display()
            ))
        })?;
    }

    std::fs::write(path, default_config_toml()).map_err(|e| {
        ConfigError::ParseError(format!(
            "failed to write default config to {}: {e}",
            path.display()
        ))
    })?;

    info!("Created default config at {}", path.display());
    Ok(())
}

fn default_config_toml() -> &'static str {
    r##"# Chase Battle Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[plugin]
# enabled = true
# debug_mode = false

[server]
# bind = "0.0.0.0"
# port = 9600              # 1-65535
# max_slots = 24           # 1-255
# ai_slots = []            # slot ids reserved for AI cars
# hello_timeout_secs = 10  # 1-120
# client_queue = 256       # 8-4096

[battle]
# timeout_secs = 0         # 0 = never expire, otherwise 30-86400
# reap_interval_secs = 30  # 1-3600

[admin]
# password = ""            # empty disables /admin

[logging]
# level = "INFO"           # DEBUG, INFO, WARNING, ERROR
"##
}
