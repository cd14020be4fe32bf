//! Spatial Safari configuration system.
//!
//! Provides TOML-based configuration with live reload and full validation.
//! All config sections use sensible defaults so partial configs work out
//! of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use spatial_config::{load_config, config_to_json};
//!
//! let config = load_config(None).expect("failed to load config");
//! let json = config_to_json(&config);
//! println!("{json}");
//! ```

pub mod reload;
pub mod schema;
pub mod toml_loader;
pub mod validation;
pub mod watcher;

// Re-export core types for convenience
pub use reload::ReloadManager;
pub use schema::{SpatialConfig, CONFIG_SCHEMA_VERSION};
pub use watcher::ConfigWatcher;

use spatial_common::ConfigError;
use std::path::Path;

/// Load and validate config.
///
/// With `Some(path)` the given file is read (and created with defaults when
/// missing); with `None` the platform default path is used.
pub fn load_config(path: Option<&Path>) -> Result<SpatialConfig, ConfigError> {
    let config = match path {
        Some(path) => toml_loader::load_or_create(path)?,
        None => toml_loader::load_default()?,
    };

    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &SpatialConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_to_json_contains_all_sections() {
        let config = SpatialConfig::default();
        let json = config_to_json(&config);
        assert!(json.contains("\"target\""));
        assert!(json.contains("\"scheduler\""));
        assert!(json.contains("\"retry\""));
        assert!(json.contains("\"apply\""));
        assert!(json.contains("\"layout\""));
        assert!(json.contains("\"logging\""));
    }

    #[test]
    fn config_schema_version_is_1() {
        assert_eq!(CONFIG_SCHEMA_VERSION, 1);
    }

    #[test]
    fn load_config_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[layout]\nedge_margin = 12\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.layout.edge_margin, 12);
    }

    #[test]
    fn load_config_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[retry]\nmax_attempts = 0\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
