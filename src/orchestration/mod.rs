//! # Orchestration Engine
//!
//! Dependency-aware planning and execution core for scaffolding runs.
//!
//! ## Core Components
//!
//! - **DependencyResolver**: converts requested units plus a static
//!   dependency matrix into a validated, topologically ordered plan
//! - **ExecutionPlan**: the resolved, ordered unit sequence with derived
//!   views (timeline, critical path, parallelizable groups)
//! - **GenerationCoordinator**: walks the plan, invokes generators,
//!   aggregates results, maintains the rollback journal, and decides
//!   whether a failure halts the run
//! - **ProgressTracker**: timing, cumulative statistics, and published
//!   lifecycle events
//! - **RollbackManager**: reverses a persisted run in reverse completion
//!   order
//!
//! Data flow: request → [`DependencyResolver`] → [`ExecutionPlan`] →
//! [`GenerationCoordinator`] → [`types::RunResult`] (+ persisted journal).

pub mod coordinator;
pub mod dependency_resolver;
pub mod errors;
pub mod execution_plan;
pub mod progress;
pub mod rollback;
pub mod types;

pub use coordinator::{CoordinatorConfig, GenerationCoordinator};
pub use dependency_resolver::{DependencyMatrix, DependencyResolver, ValidationReport};
pub use errors::{
    GeneratorError, OrchestrationError, OrchestrationResult, PlanningError, RollbackError,
};
pub use execution_plan::{ExecutionPlan, PlanPreview, PreviewRow};
pub use progress::{ProgressSnapshot, ProgressTracker};
pub use rollback::{JournalEntry, RollbackJournal, RollbackManager, RollbackReport};
pub use types::{
    Generator, GeneratorAction, ResolvedUnit, RunResult, RunStatistics, RunStatus,
    UnitDeclaration, UnitResult, UnitStatus,
};
