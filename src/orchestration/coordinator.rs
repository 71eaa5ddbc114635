//! # Generation Coordinator
//!
//! ## Architecture: Main Orchestration Engine
//!
//! The GenerationCoordinator is the central engine that coordinates a whole
//! scaffolding run. It brings the orchestration components together to
//! provide complete lifecycle management from request to sealed result:
//!
//! - **DependencyResolver**: turns the request into a validated, ordered plan
//! - **GeneratorRegistry**: resolves each unit's generator by name
//! - **ProgressTracker**: timing, statistics, and published lifecycle events
//! - **RollbackJournal**: durable record of everything the run produced
//!
//! ## Execution semantics
//!
//! Units execute strictly sequentially in plan order; each generator
//! invocation is awaited to completion before the next unit begins. A
//! critical unit's failure halts the run immediately; units after the halt
//! are neither executed nor reported. Optional failures are recorded and
//! execution continues. The sealed status is `Success` with no failures,
//! `PartialSuccess` when optional failures left some successes standing,
//! and `Failure` on a critical failure or when nothing succeeded.
//!
//! There is no per-unit timeout or cancellation: a hung generator blocks
//! the run. A cancellation token threaded through the generator contract is
//! the intended extension point.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use scaffold_core::orchestration::{DependencyMatrix, GenerationCoordinator};
//! use scaffold_core::orchestration::types::UnitDeclaration;
//! use scaffold_core::registry::GeneratorRegistry;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(GeneratorRegistry::new());
//! let coordinator = GenerationCoordinator::new(DependencyMatrix::builtin(), registry);
//!
//! let request = vec![
//!     UnitDeclaration::simple("model", true),
//!     UnitDeclaration::simple("controller", true),
//! ];
//!
//! // Preview without touching the filesystem
//! println!("{}", coordinator.dry_run(&request).await?);
//!
//! // Real run
//! let result = coordinator.execute(&request).await?;
//! println!("run {} finished: {:?}", result.run_id, result.status);
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::events::EventPublisher;
use crate::orchestration::dependency_resolver::{DependencyMatrix, DependencyResolver};
use crate::orchestration::errors::{OrchestrationError, OrchestrationResult, PlanningError};
use crate::orchestration::execution_plan::{ExecutionPlan, PlanPreview};
use crate::orchestration::progress::ProgressTracker;
use crate::orchestration::rollback::{RollbackJournal, RollbackManager};
use crate::orchestration::types::{RunResult, UnitDeclaration, UnitResult, UnitStatus};
use crate::registry::GeneratorRegistry;

/// Configuration for the coordinator
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Directory rollback journals are persisted under
    pub journal_dir: PathBuf,
    /// Capacity of the progress event channel
    pub event_channel_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            journal_dir: PathBuf::from(".scaffold/journals"),
            event_channel_capacity: 1024,
        }
    }
}

impl CoordinatorConfig {
    /// Configuration pointing journals at a test-owned directory
    pub fn for_testing(journal_dir: impl Into<PathBuf>) -> Self {
        Self {
            journal_dir: journal_dir.into(),
            event_channel_capacity: 64,
        }
    }
}

/// Central orchestration engine for scaffolding runs
pub struct GenerationCoordinator {
    resolver: DependencyResolver,
    registry: Arc<GeneratorRegistry>,
    publisher: EventPublisher,
    config: CoordinatorConfig,
}

impl GenerationCoordinator {
    pub fn new(matrix: DependencyMatrix, registry: Arc<GeneratorRegistry>) -> Self {
        Self::with_config(matrix, registry, CoordinatorConfig::default())
    }

    pub fn with_config(
        matrix: DependencyMatrix,
        registry: Arc<GeneratorRegistry>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            resolver: DependencyResolver::new(matrix),
            registry,
            publisher: EventPublisher::new(config.event_channel_capacity),
            config,
        }
    }

    /// Publisher observers subscribe to for progress events
    pub fn publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    pub fn resolver(&self) -> &DependencyResolver {
        &self.resolver
    }

    /// Rollback manager bound to this coordinator's journal directory
    pub fn rollback_manager(&self) -> RollbackManager {
        RollbackManager::new(&self.config.journal_dir)
    }

    /// Validate and resolve a request into an execution plan with predicted
    /// artifacts attached. All planning problems are collected and returned
    /// together.
    #[instrument(skip(self, request), fields(requested = request.len()))]
    pub async fn build_plan(
        &self,
        request: &[UnitDeclaration],
    ) -> OrchestrationResult<ExecutionPlan> {
        let report = self.resolver.validate_request(request);
        if !report.is_ok() {
            return Err(OrchestrationError::planning(report.errors));
        }

        let plan = self
            .resolver
            .resolve(request.to_vec())
            .map_err(|e| OrchestrationError::planning(vec![e]))?;

        let problems = plan.validate();
        if !problems.is_empty() {
            return Err(OrchestrationError::planning(
                problems
                    .into_iter()
                    .map(|reason| PlanningError::InvalidPlan { reason })
                    .collect(),
            ));
        }

        let mut predicted = Vec::new();
        for unit in plan.units() {
            // Same lookup key execution uses: the action command, not the
            // unit name
            if let Some(generator) = self.registry.get(&unit.declaration.action.command).await {
                predicted.extend(generator.expected_artifacts(&unit.declaration.action.parameters));
            }
        }
        debug!(
            units = plan.len(),
            predicted_artifacts = predicted.len(),
            "Built execution plan"
        );
        Ok(plan.with_expected_artifacts(predicted))
    }

    /// Build and render the plan without invoking any generator or touching
    /// the rollback journal
    pub async fn dry_run(&self, request: &[UnitDeclaration]) -> OrchestrationResult<PlanPreview> {
        Ok(self.build_plan(request).await?.preview())
    }

    /// Plan and execute a request end to end
    pub async fn execute(&self, request: &[UnitDeclaration]) -> OrchestrationResult<RunResult> {
        let plan = self.build_plan(request).await?;
        self.execute_plan(&plan).await
    }

    /// Execute an already-built plan against the registered generators.
    ///
    /// Always returns a sealed [`RunResult`] describing exactly what
    /// happened; generator failures are data on the result, not errors.
    #[instrument(skip(self, plan), fields(units = plan.len()))]
    pub async fn execute_plan(&self, plan: &ExecutionPlan) -> OrchestrationResult<RunResult> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let tracker = ProgressTracker::new(run_id, plan.len(), self.publisher.clone());
        let mut run = RunResult::begin(run_id, plan.len());
        let configuration = serde_json::to_value(
            plan.units()
                .iter()
                .map(|u| &u.declaration)
                .collect::<Vec<_>>(),
        )
        .unwrap_or_default();
        let mut journal = RollbackJournal::new(run_id, configuration);

        // Recommended-dependency advisories belong on the run result too
        let declarations: Vec<UnitDeclaration> =
            plan.units().iter().map(|u| u.declaration.clone()).collect();
        run.warnings
            .extend(self.resolver.validate_request(&declarations).warnings);

        info!(run_id = %run_id, units = plan.len(), "Starting generation run");
        tracker.run_started();

        let mut critical_failure = false;
        for unit in plan.units() {
            let name = unit.name();
            tracker.unit_started(name);
            info!(run_id = %run_id, unit = %name, order = unit.order, "Executing unit");

            let unit_started = Instant::now();
            let mut result = self.invoke_generator(unit.name(), &unit.declaration).await;
            if result.elapsed.is_none() {
                result = result.with_elapsed(unit_started.elapsed());
            }

            match result.status {
                UnitStatus::Success => {
                    journal.record(name, result.produced_artifacts.clone());
                    tracker.unit_completed(name, &result);
                    info!(
                        run_id = %run_id,
                        unit = %name,
                        produced = result.produced_artifacts.len(),
                        skipped = result.skipped_artifacts.len(),
                        "Unit completed"
                    );
                    run.record_unit(name, result);
                }
                UnitStatus::Skipped => {
                    tracker.unit_completed(name, &result);
                    info!(run_id = %run_id, unit = %name, "Unit skipped");
                    run.record_unit(name, result);
                }
                UnitStatus::Failure => {
                    tracker.unit_failed(name, &result);
                    error!(
                        run_id = %run_id,
                        unit = %name,
                        error = result.error.as_deref().unwrap_or("unknown"),
                        critical = unit.is_critical(),
                        "Unit failed"
                    );
                    let halt = unit.is_critical();
                    run.record_unit(name, result);
                    if halt {
                        // Remaining units are neither executed nor reported
                        critical_failure = true;
                        break;
                    }
                }
            }
        }

        run.seal(critical_failure, started.elapsed());
        tracker.run_finished(run.status);
        info!(
            run_id = %run_id,
            status = ?run.status,
            files_generated = run.statistics.files_generated,
            failures = run.statistics.units_failed,
            "Run sealed"
        );

        if !journal.is_empty() {
            run.rollback_entries = journal.entries.clone();
            match journal.persist(&self.config.journal_dir).await {
                Ok(path) => {
                    debug!(run_id = %run_id, path = %path.display(), "Journal persisted");
                }
                Err(journal_error) => {
                    // The run itself already happened; surface the problem
                    // on the result rather than discarding it
                    error!(run_id = %run_id, %journal_error, "Failed to persist rollback journal");
                    run.warnings.push(format!(
                        "rollback journal could not be persisted: {journal_error}"
                    ));
                }
            }
        }

        Ok(run)
    }

    async fn invoke_generator(&self, name: &str, declaration: &UnitDeclaration) -> UnitResult {
        let Some(generator) = self.registry.get(&declaration.action.command).await else {
            warn!(unit = %name, command = %declaration.action.command, "No generator registered");
            return UnitResult::failure(format!(
                "no generator registered for command '{}'",
                declaration.action.command
            ));
        };
        match generator.generate(&declaration.action.parameters).await {
            Ok(result) => result,
            Err(generator_error) => UnitResult::from_generator_error(&generator_error),
        }
    }
}

impl std::fmt::Debug for GenerationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationCoordinator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
