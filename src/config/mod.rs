//! # Configuration System
//!
//! Declarative configuration for the orchestration core: journal location,
//! event channel sizing, dependency-matrix extensions, and per-unit
//! overrides (criticality, default parameters).
//!
//! Configuration is loaded from TOML files with environment-variable
//! overrides and turned into the explicit values the rest of the core is
//! constructed from; nothing in the core reads configuration through global
//! state.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use scaffold_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let matrix = manager.config().dependency_matrix();
//! let coordinator_config = manager.config().coordinator_config();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

pub use error::ConfigurationError;
pub use loader::ConfigManager;

use crate::constants::{default_unit_definitions, UnitDefinition};
use crate::orchestration::coordinator::CoordinatorConfig;
use crate::orchestration::dependency_resolver::DependencyMatrix;
use crate::orchestration::types::{GeneratorAction, UnitDeclaration};

/// Per-unit configuration overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitConfig {
    /// Extra soft ordering dependencies beyond the built-in catalog
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Extra strictly required dependencies
    #[serde(default)]
    pub required: Vec<String>,
    /// Extra recommended dependencies
    #[serde(default)]
    pub recommended: Vec<String>,
    /// Override the built-in criticality for this unit
    #[serde(default)]
    pub critical: Option<bool>,
    /// Default parameters merged into every action for this unit
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
}

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaffoldConfig {
    /// Directory rollback journals are persisted under
    #[serde(default = "default_journal_dir")]
    pub journal_dir: PathBuf,
    /// Capacity of the progress event channel
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
    /// Per-unit overrides keyed by unit name
    #[serde(default)]
    pub units: HashMap<String, UnitConfig>,
}

fn default_journal_dir() -> PathBuf {
    PathBuf::from(".scaffold/journals")
}

fn default_event_channel_capacity() -> usize {
    1024
}

impl Default for ScaffoldConfig {
    fn default() -> Self {
        Self {
            journal_dir: default_journal_dir(),
            event_channel_capacity: default_event_channel_capacity(),
            units: HashMap::new(),
        }
    }
}

impl ScaffoldConfig {
    /// Dependency matrix: built-in catalog plus configured extensions
    pub fn dependency_matrix(&self) -> DependencyMatrix {
        let mut matrix = DependencyMatrix::builtin();
        for (name, unit) in &self.units {
            let mut definition = UnitDefinition::new(name.clone(), unit.critical.unwrap_or(false));
            definition.depends_on = unit.depends_on.clone();
            definition.required = unit.required.clone();
            definition.recommended = unit.recommended.clone();
            matrix.insert_definition(&definition);
        }
        matrix
    }

    /// Coordinator configuration derived from this file
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            journal_dir: self.journal_dir.clone(),
            event_channel_capacity: self.event_channel_capacity,
        }
    }

    /// Build declarations for the requested unit names, applying configured
    /// criticality overrides and default parameters on top of the built-in
    /// catalog
    pub fn declarations(&self, requested: &[&str]) -> Vec<UnitDeclaration> {
        let catalog = default_unit_definitions();
        requested
            .iter()
            .map(|name| {
                let builtin_critical = catalog
                    .iter()
                    .find(|d| d.name == *name)
                    .map_or(false, |d| d.critical);
                let overrides = self.units.get(*name);
                let critical = overrides
                    .and_then(|u| u.critical)
                    .unwrap_or(builtin_critical);
                let mut action = GeneratorAction::new(*name);
                if let Some(unit) = overrides {
                    action.parameters.extend(
                        unit.parameters
                            .iter()
                            .map(|(k, v)| (k.clone(), v.clone())),
                    );
                }
                UnitDeclaration::new(*name, action, critical)
            })
            .collect()
    }
}
