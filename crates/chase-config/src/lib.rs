//! Chase battle server configuration.
//!
//! TOML-based configuration with full validation. All sections use
//! `serde(default)` so a partial file (or no file at all) works.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use chase_config::load_config;
//!
//! let config = load_config().expect("failed to load config");
//! println!("listening on {}", config.server.listen_addr());
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    AdminConfig, BattleConfig, ChaseConfig, LogLevel, LoggingConfig, PluginConfig, ServerConfig,
    CONFIG_SCHEMA_VERSION,
};

use chase_common::ConfigError;
use std::path::Path;

/// Load config from the platform default path, creating it if missing.
pub fn load_config() -> Result<ChaseConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config)?;
    Ok(config)
}

/// Load config from an explicit path.
///
/// A missing file is an error here; only the default path gets created.
pub fn load_config_from(path: &Path) -> Result<ChaseConfig, ConfigError> {
    let config = toml_loader::load_from_path(path)?;
    validation::validate(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_schema_version_is_1() {
        assert_eq!(CONFIG_SCHEMA_VERSION, 1);
    }

    #[test]
    fn load_config_from_missing_path_fails() {
        let err = load_config_from(Path::new("/tmp/no_such_chase_config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn load_config_from_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = 7000\n").unwrap();
        let config = load_config_from(&path).unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.max_slots, 24);
    }
}
