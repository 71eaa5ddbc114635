//! # Orchestration Errors
//!
//! Error types covering planning, generator invocation, and rollback.
//!
//! Planning problems are collected into lists and surfaced together so a
//! caller sees every issue in one pass instead of fixing them one at a
//! time. Execution failures are attached to the failing unit's result; the
//! types here cover the cases where no [`RunResult`](crate::orchestration::types::RunResult)
//! can be produced at all.

use std::path::PathBuf;
use thiserror::Error;

pub type OrchestrationResult<T> = std::result::Result<T, OrchestrationError>;

/// Problems detected while turning a request into an execution plan
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanningError {
    /// The dependency matrix, restricted to the requested units, contains a
    /// cycle. `remaining` names the units that could not be ordered.
    #[error("circular dependency among requested units: {remaining:?}")]
    CircularDependency { remaining: Vec<String> },

    /// A unit strictly requires another unit that is not in the requested set
    #[error("unit '{unit}' requires '{dependency}', which is not in the requested set")]
    UnresolvedDependency { unit: String, dependency: String },

    /// The same unit name appears more than once in a request
    #[error("duplicate unit '{unit}' in request")]
    DuplicateUnit { unit: String },

    /// A constructed plan violates an internal consistency rule
    #[error("invalid plan: {reason}")]
    InvalidPlan { reason: String },
}

/// Failure returned by a generator invocation.
///
/// Generators report failure as data rather than unwinding; the coordinator
/// converts any `Err` into a failure
/// [`UnitResult`](crate::orchestration::types::UnitResult).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    #[error("generator '{generator}' failed: {reason}")]
    Failed { generator: String, reason: String },

    #[error("generator '{generator}' rejected parameters: {reason}")]
    InvalidParameters { generator: String, reason: String },

    #[error("generator process exited with status {code}")]
    NonZeroExit { code: i32 },
}

/// Top-level orchestration failures
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// Planning failed; all collected problems are carried together
    #[error("planning failed: {}", .errors.iter().map(std::string::ToString::to_string).collect::<Vec<_>>().join("; "))]
    PlanningFailed { errors: Vec<PlanningError> },

    /// The rollback journal could not be persisted or read
    #[error("journal error: {0}")]
    Journal(#[from] RollbackError),

    /// A progress event could not be published
    #[error("event publishing failed for '{event}': {reason}")]
    EventPublishing { event: String, reason: String },

    /// The coordinator was constructed with an unusable configuration
    #[error("configuration error: {reason}")]
    Configuration { reason: String },
}

/// Rollback and journal persistence failures
#[derive(Debug, Error)]
pub enum RollbackError {
    #[error("no rollback journal found in {}", .dir.display())]
    NoJournal { dir: PathBuf },

    #[error("journal I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("journal at {} is not valid JSON: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl OrchestrationError {
    /// Wrap a non-empty list of planning problems
    pub fn planning(errors: Vec<PlanningError>) -> Self {
        OrchestrationError::PlanningFailed { errors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planning_failed_joins_all_errors() {
        let err = OrchestrationError::planning(vec![
            PlanningError::UnresolvedDependency {
                unit: "controller".to_string(),
                dependency: "model".to_string(),
            },
            PlanningError::DuplicateUnit {
                unit: "views".to_string(),
            },
        ]);
        let rendered = err.to_string();
        assert!(rendered.contains("controller"));
        assert!(rendered.contains("duplicate unit 'views'"));
    }

    #[test]
    fn test_circular_dependency_names_remaining_units() {
        let err = PlanningError::CircularDependency {
            remaining: vec!["a".to_string(), "b".to_string()],
        };
        assert!(err.to_string().contains("\"a\""));
    }
}
