//! # System Constants
//!
//! Canonical unit names, the default dependency matrix metadata, and the
//! named progress events that define the operational boundaries of the
//! scaffolding orchestration core.
//!
//! Deployments may extend the unit catalog at runtime through
//! [`crate::orchestration::DependencyMatrix`]; the definitions here cover
//! the built-in generators.

use serde::{Deserialize, Serialize};

/// Built-in generation unit names
pub mod units {
    pub const MODEL: &str = "model";
    pub const MIGRATION: &str = "migration";
    pub const FACTORY: &str = "factory";
    pub const CONTROLLER: &str = "controller";
    pub const VIEWS: &str = "views";
    pub const DATATABLE: &str = "datatable";

    /// All built-in unit names, in the order they are usually requested
    pub const ALL: [&str; 6] = [MODEL, MIGRATION, FACTORY, CONTROLLER, VIEWS, DATATABLE];
}

/// Progress events published during a run
pub mod events {
    pub const RUN_STARTED: &str = "run.started";
    pub const UNIT_STARTED: &str = "run.unit_started";
    pub const UNIT_COMPLETED: &str = "run.unit_completed";
    pub const UNIT_FAILED: &str = "run.unit_failed";
    pub const RUN_COMPLETED: &str = "run.completed";
    pub const RUN_FAILED: &str = "run.failed";
}

/// Declarative metadata for a unit type.
///
/// `depends_on` drives ordering only: dependencies on units absent from a
/// request are pruned, never errors. `required` and `recommended` are
/// enforced by the separate pre-flight validation pass, as hard errors and
/// warnings respectively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitDefinition {
    pub name: String,
    /// Soft ordering dependencies (the static dependency matrix row)
    pub depends_on: Vec<String>,
    /// Dependencies that must be present in the requested set
    pub required: Vec<String>,
    /// Dependencies whose absence is reported as a warning
    pub recommended: Vec<String>,
    /// Whether a failure of this unit halts the run
    pub critical: bool,
}

impl UnitDefinition {
    pub fn new(name: impl Into<String>, critical: bool) -> Self {
        Self {
            name: name.into(),
            depends_on: Vec::new(),
            required: Vec::new(),
            recommended: Vec::new(),
            critical,
        }
    }

    #[must_use]
    pub fn depends_on(mut self, deps: &[&str]) -> Self {
        self.depends_on = deps.iter().map(|d| (*d).to_string()).collect();
        self
    }

    #[must_use]
    pub fn requires(mut self, deps: &[&str]) -> Self {
        self.required = deps.iter().map(|d| (*d).to_string()).collect();
        self
    }

    #[must_use]
    pub fn recommends(mut self, deps: &[&str]) -> Self {
        self.recommended = deps.iter().map(|d| (*d).to_string()).collect();
        self
    }
}

/// Default unit catalog for the built-in generators.
///
/// Controller strictly requires a model; views and datatable tolerate a
/// missing controller with a warning. Ordering edges are always soft.
pub fn default_unit_definitions() -> Vec<UnitDefinition> {
    vec![
        UnitDefinition::new(units::MODEL, true),
        UnitDefinition::new(units::MIGRATION, true).depends_on(&[units::MODEL]),
        UnitDefinition::new(units::FACTORY, false)
            .depends_on(&[units::MODEL])
            .recommends(&[units::MODEL]),
        UnitDefinition::new(units::CONTROLLER, true)
            .depends_on(&[units::MODEL])
            .requires(&[units::MODEL]),
        UnitDefinition::new(units::VIEWS, false)
            .depends_on(&[units::MODEL, units::CONTROLLER])
            .recommends(&[units::CONTROLLER]),
        UnitDefinition::new(units::DATATABLE, false)
            .depends_on(&[units::MODEL, units::CONTROLLER])
            .recommends(&[units::MODEL]),
    ]
}
