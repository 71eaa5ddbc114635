#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Scaffold Core
//!
//! Orchestration core for a code-scaffolding tool: assembles independent
//! generators (model, controller, views, datatable, migration, factory)
//! into one coherent, dependency-aware run.
//!
//! ## Overview
//!
//! The core turns a declarative request into an ordered plan of generation
//! units, executes the plan sequentially with per-unit success/failure/skip
//! semantics and a critical/optional distinction, tracks progress and
//! timing, and can roll back a partially completed run from its persisted
//! journal. The generators themselves are external collaborators reached
//! through the [`orchestration::types::Generator`] trait.
//!
//! ## Module Organization
//!
//! - [`orchestration`] - Planning, execution, progress, and rollback
//! - [`registry`] - Generator registration and discovery
//! - [`events`] - Lifecycle event publishing
//! - [`config`] - Configuration management
//! - [`constants`] - Unit catalog, dependency matrix defaults, event names
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scaffold_core::orchestration::{DependencyMatrix, GenerationCoordinator};
//! use scaffold_core::orchestration::types::UnitDeclaration;
//! use scaffold_core::registry::GeneratorRegistry;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! scaffold_core::logging::init_structured_logging();
//!
//! let registry = Arc::new(GeneratorRegistry::new());
//! // ... register generators ...
//! let coordinator = GenerationCoordinator::new(DependencyMatrix::builtin(), registry);
//!
//! let request = vec![
//!     UnitDeclaration::simple("model", true),
//!     UnitDeclaration::simple("controller", true),
//!     UnitDeclaration::simple("views", false),
//! ];
//!
//! let result = coordinator.execute(&request).await?;
//! println!("{:?}: {} files", result.status, result.statistics.files_generated);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod events;
pub mod logging;
pub mod orchestration;
pub mod registry;

pub use config::{ConfigManager, ScaffoldConfig};
pub use constants::{default_unit_definitions, UnitDefinition};
pub use events::EventPublisher;
pub use orchestration::{
    CoordinatorConfig, DependencyMatrix, DependencyResolver, ExecutionPlan, GenerationCoordinator,
    PlanPreview, ProgressTracker, RollbackManager, RunResult, RunStatus, UnitResult, UnitStatus,
};
pub use registry::GeneratorRegistry;
