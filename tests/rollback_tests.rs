//! Journal persistence and rollback against a real filesystem.

mod common;

use std::sync::{Arc, Mutex};

use scaffold_core::constants::units;
use scaffold_core::orchestration::types::UnitDeclaration;
use scaffold_core::orchestration::{
    CoordinatorConfig, DependencyMatrix, GenerationCoordinator, RollbackJournal, RunStatus,
};
use scaffold_core::registry::GeneratorRegistry;

use common::{FailingGenerator, FileGenerator};

#[tokio::test]
async fn successful_run_then_rollback_removes_every_artifact_and_the_journal() {
    let dir = tempfile::tempdir().unwrap();
    let journal_dir = dir.path().join("journals");
    let invocations = Arc::new(Mutex::new(Vec::new()));
    let registry = Arc::new(GeneratorRegistry::new());
    for name in [units::MODEL, units::CONTROLLER] {
        registry
            .register(Arc::new(FileGenerator::new(
                name,
                dir.path(),
                invocations.clone(),
            )))
            .await;
    }
    let coordinator = GenerationCoordinator::with_config(
        DependencyMatrix::new(),
        registry,
        CoordinatorConfig::for_testing(&journal_dir),
    );

    let request = vec![
        UnitDeclaration::simple(units::MODEL, true),
        UnitDeclaration::simple(units::CONTROLLER, true),
    ];
    let result = coordinator.execute(&request).await.unwrap();
    assert_eq!(result.status, RunStatus::Success);
    assert!(dir.path().join("model.rs").exists());
    assert!(dir.path().join("controller.rs").exists());

    let report = coordinator.rollback_manager().rollback_latest().await.unwrap();
    assert_eq!(report.run_id, result.run_id);
    assert_eq!(report.files_removed, 2);
    assert!(report.failures.is_empty());
    assert!(report.journal_removed);
    assert!(!dir.path().join("model.rs").exists());
    assert!(!dir.path().join("controller.rs").exists());
    assert!(RollbackJournal::latest(&journal_dir).await.unwrap().is_none());
}

#[tokio::test]
async fn failed_run_still_persists_journal_for_produced_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let journal_dir = dir.path().join("journals");
    let invocations = Arc::new(Mutex::new(Vec::new()));
    let registry = Arc::new(GeneratorRegistry::new());
    registry
        .register(Arc::new(FileGenerator::new(
            units::MODEL,
            dir.path(),
            invocations.clone(),
        )))
        .await;
    registry
        .register(Arc::new(FailingGenerator::new(
            units::CONTROLLER,
            invocations.clone(),
        )))
        .await;
    let coordinator = GenerationCoordinator::with_config(
        DependencyMatrix::new(),
        registry,
        CoordinatorConfig::for_testing(&journal_dir),
    );

    let request = vec![
        UnitDeclaration::simple(units::MODEL, true),
        UnitDeclaration::simple(units::CONTROLLER, true),
    ];
    let result = coordinator.execute(&request).await.unwrap();
    assert_eq!(result.status, RunStatus::Failure);

    let (_, journal) = RollbackJournal::latest(&journal_dir).await.unwrap().unwrap();
    assert_eq!(journal.run_id, result.run_id);
    assert_eq!(journal.entries.len(), 1);
    assert_eq!(journal.entries[0].unit, units::MODEL);

    let report = coordinator.rollback_manager().rollback_latest().await.unwrap();
    assert_eq!(report.files_removed, 1);
    assert!(!dir.path().join("model.rs").exists());
}

#[tokio::test]
async fn run_without_artifacts_persists_no_journal() {
    let dir = tempfile::tempdir().unwrap();
    let journal_dir = dir.path().join("journals");
    let invocations = Arc::new(Mutex::new(Vec::new()));
    let registry = Arc::new(GeneratorRegistry::new());
    registry
        .register(Arc::new(FailingGenerator::new(
            units::MODEL,
            invocations.clone(),
        )))
        .await;
    let coordinator = GenerationCoordinator::with_config(
        DependencyMatrix::new(),
        registry,
        CoordinatorConfig::for_testing(&journal_dir),
    );

    let result = coordinator
        .execute(&[UnitDeclaration::simple(units::MODEL, false)])
        .await
        .unwrap();
    assert_eq!(result.status, RunStatus::Failure);
    assert!(result.rollback_entries.is_empty());
    assert!(!journal_dir.exists());
}

#[tokio::test]
async fn rollback_tolerates_files_deleted_out_of_band() {
    let dir = tempfile::tempdir().unwrap();
    let journal_dir = dir.path().join("journals");
    let invocations = Arc::new(Mutex::new(Vec::new()));
    let registry = Arc::new(GeneratorRegistry::new());
    for name in [units::MODEL, units::VIEWS] {
        registry
            .register(Arc::new(FileGenerator::new(
                name,
                dir.path(),
                invocations.clone(),
            )))
            .await;
    }
    let coordinator = GenerationCoordinator::with_config(
        DependencyMatrix::new(),
        registry,
        CoordinatorConfig::for_testing(&journal_dir),
    );

    coordinator
        .execute(&[
            UnitDeclaration::simple(units::MODEL, true),
            UnitDeclaration::simple(units::VIEWS, false),
        ])
        .await
        .unwrap();

    // Someone removes an artifact before rollback runs
    tokio::fs::remove_file(dir.path().join("views.rs")).await.unwrap();

    let report = coordinator.rollback_manager().rollback_latest().await.unwrap();
    assert_eq!(report.files_removed, 1);
    assert_eq!(report.already_absent, 1);
    assert!(report.failures.is_empty());
    assert!(report.journal_removed);
}
