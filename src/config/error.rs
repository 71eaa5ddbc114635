//! Configuration error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("failed to read configuration from {source_name}: {reason}")]
    LoadFailed { source_name: String, reason: String },

    #[error("configuration value '{field}' is invalid: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl From<config::ConfigError> for ConfigurationError {
    fn from(error: config::ConfigError) -> Self {
        ConfigurationError::LoadFailed {
            source_name: "config sources".to_string(),
            reason: error.to_string(),
        }
    }
}
