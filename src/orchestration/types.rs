//! # Orchestration Types
//!
//! Core types and data structures shared across the orchestration system:
//! unit declarations, resolved units, unit and run results, run statistics,
//! and the generator contract.
//!
//! Units are two-phase. A [`UnitDeclaration`] is the immutable input a
//! caller assembles (name, action, criticality, parameters); the resolver
//! attaches ordering in a separate [`ResolvedUnit`] so the same
//! declarations can be planned repeatedly (dry run, then real run) without
//! aliasing hazards.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use crate::orchestration::errors::GeneratorError;
use crate::orchestration::rollback::JournalEntry;

/// Opaque handle to the generator a unit invokes: a command descriptor plus
/// a parameter bag forwarded verbatim to the generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorAction {
    pub command: String,
    pub parameters: HashMap<String, serde_json::Value>,
}

impl GeneratorAction {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            parameters: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }
}

/// Immutable declaration of one requested generation unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitDeclaration {
    /// Stable unit name ("model", "controller", ...)
    pub name: String,
    /// Generator to invoke and the parameters to pass it
    pub action: GeneratorAction,
    /// Whether a failure of this unit halts the run
    pub critical: bool,
}

impl UnitDeclaration {
    pub fn new(name: impl Into<String>, action: GeneratorAction, critical: bool) -> Self {
        Self {
            name: name.into(),
            action,
            critical,
        }
    }

    /// Declaration whose action command is the unit name itself, the common
    /// case for the built-in generators
    pub fn simple(name: &str, critical: bool) -> Self {
        Self::new(name, GeneratorAction::new(name), critical)
    }
}

/// A declaration plus the ordering the resolver computed for it.
///
/// `resolved_dependencies` is always a subset of `declared_dependencies`:
/// declared edges pointing at units absent from the request are pruned.
/// Every resolved dependency belongs to a unit with a strictly smaller
/// `order` in the same plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedUnit {
    /// Execution rank, unique within a plan, starting at 1
    pub order: u32,
    pub declaration: UnitDeclaration,
    /// Type-level dependencies from the static matrix
    pub declared_dependencies: BTreeSet<String>,
    /// Declared dependencies actually present in this run
    pub resolved_dependencies: BTreeSet<String>,
}

impl ResolvedUnit {
    pub fn name(&self) -> &str {
        &self.declaration.name
    }

    pub fn is_critical(&self) -> bool {
        self.declaration.critical
    }
}

/// Outcome of a single unit execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Success,
    Failure,
    Skipped,
}

/// Outcome of a whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    PartialSuccess,
    Failure,
}

/// Result of one generator invocation.
///
/// Invariants: `Failure` always carries a non-empty `error`; `Skipped`
/// carries no artifacts. The named constructors uphold both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitResult {
    pub status: UnitStatus,
    pub produced_artifacts: Vec<PathBuf>,
    pub skipped_artifacts: Vec<PathBuf>,
    pub error: Option<String>,
    pub warnings: Vec<String>,
    #[serde(default, with = "optional_duration_ms")]
    pub elapsed: Option<Duration>,
}

mod optional_duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(v: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        v.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

impl UnitResult {
    /// Successful generation with the files it produced and skipped
    pub fn success(produced: Vec<PathBuf>, skipped: Vec<PathBuf>) -> Self {
        Self {
            status: UnitStatus::Success,
            produced_artifacts: produced,
            skipped_artifacts: skipped,
            error: None,
            warnings: Vec::new(),
            elapsed: None,
        }
    }

    /// Failed generation with the error that caused it
    pub fn failure(error: impl Into<String>) -> Self {
        let mut message: String = error.into();
        if message.is_empty() {
            message = "unspecified generator failure".to_string();
        }
        Self {
            status: UnitStatus::Failure,
            produced_artifacts: Vec::new(),
            skipped_artifacts: Vec::new(),
            error: Some(message),
            warnings: Vec::new(),
            elapsed: None,
        }
    }

    /// Unit was deliberately skipped; carries no artifacts
    pub fn skipped() -> Self {
        Self {
            status: UnitStatus::Skipped,
            produced_artifacts: Vec::new(),
            skipped_artifacts: Vec::new(),
            error: None,
            warnings: Vec::new(),
            elapsed: None,
        }
    }

    /// Convert a caught error into a failure result, preserving the
    /// originating error type alongside the message
    pub fn from_error<E: std::error::Error>(err: &E) -> Self {
        Self::failure(format!("{}: {err}", std::any::type_name::<E>()))
    }

    /// Convert a generator contract error into a failure result
    pub fn from_generator_error(err: &GeneratorError) -> Self {
        Self::failure(err.to_string())
    }

    /// Convert a process exit code: zero is an empty success, anything else
    /// a failure recording the code
    pub fn from_exit_code(code: i32) -> Self {
        if code == 0 {
            Self::success(Vec::new(), Vec::new())
        } else {
            Self::from_generator_error(&GeneratorError::NonZeroExit { code })
        }
    }

    #[must_use]
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    #[must_use]
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = Some(elapsed);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == UnitStatus::Success
    }

    pub fn is_failure(&self) -> bool {
        self.status == UnitStatus::Failure
    }

    pub fn is_skipped(&self) -> bool {
        self.status == UnitStatus::Skipped
    }

    /// Combine two unit results. Status escalates toward failure
    /// (failure > success > skipped); artifact lists merge without
    /// duplicates; warnings concatenate; errors join with `"; "`; elapsed
    /// times sum.
    #[must_use]
    pub fn merge(mut self, other: UnitResult) -> Self {
        self.status = match (self.status, other.status) {
            (UnitStatus::Failure, _) | (_, UnitStatus::Failure) => UnitStatus::Failure,
            (UnitStatus::Success, _) | (_, UnitStatus::Success) => UnitStatus::Success,
            _ => UnitStatus::Skipped,
        };
        merge_paths(&mut self.produced_artifacts, other.produced_artifacts);
        merge_paths(&mut self.skipped_artifacts, other.skipped_artifacts);
        self.warnings.extend(other.warnings);
        self.error = join_errors(self.error.take(), other.error);
        self.elapsed = match (self.elapsed, other.elapsed) {
            (Some(a), Some(b)) => Some(a + b),
            (a, b) => a.or(b),
        };
        self
    }
}

/// Cumulative statistics for a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStatistics {
    pub units_total: usize,
    pub units_completed: usize,
    pub units_failed: usize,
    pub units_skipped: usize,
    pub files_generated: usize,
    pub files_skipped: usize,
    pub total_duration_ms: u64,
    /// Per-unit wall-clock durations, keyed by unit name
    pub unit_durations_ms: BTreeMap<String, u64>,
}

impl RunStatistics {
    /// Unit with the longest recorded duration
    pub fn slowest_unit(&self) -> Option<(&str, u64)> {
        self.unit_durations_ms
            .iter()
            .max_by_key(|(_, ms)| **ms)
            .map(|(name, ms)| (name.as_str(), *ms))
    }

    /// Unit with the shortest recorded duration
    pub fn fastest_unit(&self) -> Option<(&str, u64)> {
        self.unit_durations_ms
            .iter()
            .min_by_key(|(_, ms)| **ms)
            .map(|(name, ms)| (name.as_str(), *ms))
    }

    /// Combine two statistics records by summing totals and unioning the
    /// per-unit breakdowns
    #[must_use]
    pub fn merge(mut self, other: RunStatistics) -> Self {
        self.units_total += other.units_total;
        self.units_completed += other.units_completed;
        self.units_failed += other.units_failed;
        self.units_skipped += other.units_skipped;
        self.files_generated += other.files_generated;
        self.files_skipped += other.files_skipped;
        self.total_duration_ms += other.total_duration_ms;
        self.unit_durations_ms.extend(other.unit_durations_ms);
        self
    }
}

/// Aggregated outcome of a whole run.
///
/// Built incrementally as the coordinator completes each unit and sealed
/// when the plan finishes or aborts. A caller always receives one of these,
/// even on total failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    /// Per-unit outcomes in completion order
    pub unit_results: Vec<(String, UnitResult)>,
    pub produced_artifacts: Vec<PathBuf>,
    pub skipped_artifacts: Vec<PathBuf>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub statistics: RunStatistics,
    /// Journal entries recorded during this run, in completion order
    pub rollback_entries: Vec<JournalEntry>,
}

impl RunResult {
    /// Empty, unsealed result for a run that is about to start
    pub fn begin(run_id: Uuid, units_total: usize) -> Self {
        Self {
            run_id,
            status: RunStatus::Success,
            started_at: Utc::now(),
            unit_results: Vec::new(),
            produced_artifacts: Vec::new(),
            skipped_artifacts: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            statistics: RunStatistics {
                units_total,
                ..RunStatistics::default()
            },
            rollback_entries: Vec::new(),
        }
    }

    /// Fold one unit's outcome into the aggregate
    pub fn record_unit(&mut self, name: &str, result: UnitResult) {
        let elapsed_ms = result
            .elapsed
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        match result.status {
            UnitStatus::Success => {
                self.statistics.units_completed += 1;
                self.statistics.files_generated += result.produced_artifacts.len();
                self.statistics.files_skipped += result.skipped_artifacts.len();
            }
            UnitStatus::Failure => {
                self.statistics.units_failed += 1;
                if let Some(error) = &result.error {
                    self.errors.push(format!("{name}: {error}"));
                }
            }
            UnitStatus::Skipped => {
                self.statistics.units_skipped += 1;
            }
        }
        if let Some(ms) = elapsed_ms {
            self.statistics.unit_durations_ms.insert(name.to_string(), ms);
        }
        merge_paths(&mut self.produced_artifacts, result.produced_artifacts.clone());
        merge_paths(&mut self.skipped_artifacts, result.skipped_artifacts.clone());
        self.warnings
            .extend(result.warnings.iter().map(|w| format!("{name}: {w}")));
        self.unit_results.push((name.to_string(), result));
    }

    /// Finalize the status once execution ends.
    ///
    /// Failure when a critical unit failed or nothing succeeded; partial
    /// success when some units succeeded despite non-critical failures.
    pub fn seal(&mut self, critical_failure: bool, total_duration: Duration) {
        self.statistics.total_duration_ms =
            u64::try_from(total_duration.as_millis()).unwrap_or(u64::MAX);
        let failures = self.statistics.units_failed;
        let successes = self.statistics.units_completed;
        self.status = if critical_failure || (failures > 0 && successes == 0) {
            RunStatus::Failure
        } else if failures > 0 {
            RunStatus::PartialSuccess
        } else {
            RunStatus::Success
        };
        if self.status == RunStatus::PartialSuccess {
            self.warnings.push(
                "one or more optional units failed; rolling back this run is recommended"
                    .to_string(),
            );
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    /// Names of units that failed, in completion order
    pub fn failed_units(&self) -> Vec<&str> {
        self.unit_results
            .iter()
            .filter(|(_, r)| r.is_failure())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Combine two run results. Status escalates toward failure
    /// (failure > partial success > success); artifact lists merge without
    /// duplicates or lost entries; errors, warnings, statistics, and journal
    /// entries concatenate.
    #[must_use]
    pub fn merge(mut self, other: RunResult) -> Self {
        self.status = match (self.status, other.status) {
            (RunStatus::Failure, _) | (_, RunStatus::Failure) => RunStatus::Failure,
            (RunStatus::PartialSuccess, _) | (_, RunStatus::PartialSuccess) => {
                RunStatus::PartialSuccess
            }
            _ => RunStatus::Success,
        };
        self.unit_results.extend(other.unit_results);
        merge_paths(&mut self.produced_artifacts, other.produced_artifacts);
        merge_paths(&mut self.skipped_artifacts, other.skipped_artifacts);
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.statistics = self.statistics.merge(other.statistics);
        self.rollback_entries.extend(other.rollback_entries);
        self
    }
}

/// Append paths not already present, preserving first-seen order
fn merge_paths(into: &mut Vec<PathBuf>, from: Vec<PathBuf>) {
    for path in from {
        if !into.contains(&path) {
            into.push(path);
        }
    }
}

fn join_errors(a: Option<String>, b: Option<String>) -> Option<String> {
    match (a, b) {
        (Some(a), Some(b)) => Some(format!("{a}; {b}")),
        (a, b) => a.or(b),
    }
}

/// Generator contract.
///
/// Implementors are the external collaborators that emit framework-specific
/// source text. They report failure as a returned [`GeneratorError`] (or a
/// failure [`UnitResult`]), never by unwinding across the orchestration
/// boundary. Invocations are synchronous from the coordinator's point of
/// view: one unit is awaited to completion before the next begins.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Unit name this generator serves
    fn name(&self) -> &str;

    /// Produce the unit's artifacts from the given parameters
    async fn generate(
        &self,
        parameters: &HashMap<String, serde_json::Value>,
    ) -> std::result::Result<UnitResult, GeneratorError>;

    /// Paths this generator would produce for the given parameters, used
    /// for dry-run previews and rollback bookkeeping before any real output
    /// exists. Defaults to no prediction.
    fn expected_artifacts(
        &self,
        _parameters: &HashMap<String, serde_json::Value>,
    ) -> Vec<PathBuf> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_always_carries_an_error() {
        let result = UnitResult::failure("");
        assert!(result.error.as_deref().is_some_and(|e| !e.is_empty()));
    }

    #[test]
    fn test_skipped_carries_no_artifacts() {
        let result = UnitResult::skipped();
        assert!(result.produced_artifacts.is_empty());
        assert!(result.skipped_artifacts.is_empty());
        assert!(result.error.is_none());
    }

    #[test]
    fn test_exit_code_conversion() {
        assert!(UnitResult::from_exit_code(0).is_success());
        let failed = UnitResult::from_exit_code(2);
        assert!(failed.is_failure());
        assert_eq!(
            failed.error.as_deref(),
            Some("generator process exited with status 2")
        );
    }

    #[test]
    fn test_from_error_preserves_type_name() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing template");
        let result = UnitResult::from_error(&io_err);
        let message = result.error.unwrap();
        assert!(message.contains("std::io::error::Error") || message.contains("io::Error"));
        assert!(message.contains("missing template"));
    }

    #[test]
    fn test_unit_merge_escalates_to_failure() {
        let merged = UnitResult::success(vec![PathBuf::from("a.rs")], Vec::new())
            .merge(UnitResult::failure("boom"));
        assert!(merged.is_failure());
        assert_eq!(merged.error.as_deref(), Some("boom"));
        assert_eq!(merged.produced_artifacts.len(), 1);
    }

    #[test]
    fn test_unit_merge_deduplicates_artifacts() {
        let a = UnitResult::success(vec![PathBuf::from("m.rs"), PathBuf::from("c.rs")], Vec::new());
        let merged = a.clone().merge(a);
        assert_eq!(merged.produced_artifacts.len(), 2);
    }

    #[test]
    fn test_run_merge_is_lossless_and_deduplicated() {
        let mut run = RunResult::begin(Uuid::new_v4(), 1);
        run.record_unit(
            "model",
            UnitResult::success(vec![PathBuf::from("app/models/post.rs")], Vec::new()),
        );
        run.seal(false, Duration::from_millis(5));
        let merged = run.clone().merge(run);
        assert_eq!(merged.produced_artifacts.len(), 1);
        assert_eq!(merged.unit_results.len(), 2);
    }

    #[test]
    fn test_seal_failure_when_nothing_succeeded() {
        let mut run = RunResult::begin(Uuid::new_v4(), 1);
        run.record_unit("views", UnitResult::failure("template missing"));
        run.seal(false, Duration::from_millis(1));
        assert_eq!(run.status, RunStatus::Failure);
    }

    #[test]
    fn test_seal_partial_success_warns_about_rollback() {
        let mut run = RunResult::begin(Uuid::new_v4(), 2);
        run.record_unit(
            "model",
            UnitResult::success(vec![PathBuf::from("m.rs")], Vec::new()),
        );
        run.record_unit("views", UnitResult::failure("template missing"));
        run.seal(false, Duration::from_millis(1));
        assert_eq!(run.status, RunStatus::PartialSuccess);
        assert!(run.warnings.iter().any(|w| w.contains("recommended")));
        assert_eq!(run.failed_units(), vec!["views"]);
    }

    #[test]
    fn test_statistics_slowest_and_fastest() {
        let mut stats = RunStatistics::default();
        stats.unit_durations_ms.insert("model".to_string(), 120);
        stats.unit_durations_ms.insert("views".to_string(), 30);
        assert_eq!(stats.slowest_unit(), Some(("model", 120)));
        assert_eq!(stats.fastest_unit(), Some(("views", 30)));
    }
}
