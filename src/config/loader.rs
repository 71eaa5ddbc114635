//! Configuration loading with environment awareness.
//!
//! Sources, later ones winning: `config/scaffold.toml`, then
//! `config/scaffold.<environment>.toml`, then `SCAFFOLD__*` environment
//! variables (double-underscore path separator). Missing files are fine;
//! the built-in defaults cover everything.

use config::{Config, Environment, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::{ConfigurationError, ScaffoldConfig};

/// Loads and holds the effective configuration for one process
#[derive(Debug, Clone)]
pub struct ConfigManager {
    environment: String,
    config: ScaffoldConfig,
}

impl ConfigManager {
    /// Load from the default `config/` directory
    pub fn load() -> Result<Self, ConfigurationError> {
        Self::load_from_dir(Path::new("config"))
    }

    /// Load from a specific directory (used by tests)
    pub fn load_from_dir(dir: &Path) -> Result<Self, ConfigurationError> {
        let environment = detect_environment();
        let base: PathBuf = dir.join("scaffold.toml");
        let overlay: PathBuf = dir.join(format!("scaffold.{environment}.toml"));
        debug!(
            environment = %environment,
            base = %base.display(),
            overlay = %overlay.display(),
            "Loading configuration"
        );

        let settings = Config::builder()
            .add_source(File::from(base).required(false))
            .add_source(File::from(overlay).required(false))
            .add_source(Environment::with_prefix("SCAFFOLD").separator("__"))
            .build()?;
        let config: ScaffoldConfig = settings.try_deserialize()?;

        info!(
            environment = %environment,
            journal_dir = %config.journal_dir.display(),
            unit_overrides = config.units.len(),
            "Configuration loaded"
        );
        Ok(Self {
            environment,
            config,
        })
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config(&self) -> &ScaffoldConfig {
        &self.config
    }
}

/// Current environment, defaulting to development
fn detect_environment() -> String {
    std::env::var("SCAFFOLD_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::load_from_dir(dir.path()).unwrap();
        assert_eq!(manager.config().event_channel_capacity, 1024);
    }

    #[test]
    fn test_environment_overlay_wins_over_base() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("scaffold.toml"),
            "event_channel_capacity = 16\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("scaffold.development.toml"),
            "event_channel_capacity = 32\n",
        )
        .unwrap();
        let manager = ConfigManager::load_from_dir(dir.path()).unwrap();
        assert_eq!(manager.config().event_channel_capacity, 32);
    }

    #[test]
    fn test_unit_overrides_parse_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("scaffold.toml"),
            r#"
journal_dir = "/tmp/journals"

[units.views]
critical = true
recommended = ["controller"]

[units.views.parameters]
layout = "admin"
"#,
        )
        .unwrap();
        let manager = ConfigManager::load_from_dir(dir.path()).unwrap();
        let config = manager.config();
        assert_eq!(config.journal_dir, PathBuf::from("/tmp/journals"));
        let views = &config.units["views"];
        assert_eq!(views.critical, Some(true));
        assert_eq!(views.parameters["layout"], serde_json::json!("admin"));
    }
}
