//! # Rollback Journal
//!
//! Durable record of the artifacts a run produced, written after any run
//! that produced at least one file, and the best-effort sweep that reverses
//! such a run.
//!
//! The journal is a JSON document keyed by run: run id, start timestamp,
//! the configuration the run was built from, and one entry per completed
//! unit in completion order. Rollback deletes recorded artifacts in
//! *reverse* completion order; a missing file counts as already absent and
//! a deletion failure is logged and counted but never stops the sweep.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::orchestration::errors::RollbackError;

/// One completed unit's contribution to the journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub unit: String,
    pub artifacts: Vec<PathBuf>,
    pub recorded_at: DateTime<Utc>,
}

/// JSON-serializable record of everything a run wrote to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackJournal {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Snapshot of the configuration the run was built from
    pub configuration: serde_json::Value,
    /// Entries in completion order
    pub entries: Vec<JournalEntry>,
}

impl RollbackJournal {
    pub fn new(run_id: Uuid, configuration: serde_json::Value) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            configuration,
            entries: Vec::new(),
        }
    }

    /// Record the artifacts one unit produced
    pub fn record(&mut self, unit: impl Into<String>, artifacts: Vec<PathBuf>) {
        self.entries.push(JournalEntry {
            unit: unit.into(),
            artifacts,
            recorded_at: Utc::now(),
        });
    }

    /// True when no unit produced any artifact
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|e| e.artifacts.is_empty())
    }

    /// Total artifact paths recorded
    pub fn artifact_count(&self) -> usize {
        self.entries.iter().map(|e| e.artifacts.len()).sum()
    }

    fn file_name(&self) -> String {
        format!(
            "journal-{}-{}.json",
            self.started_at.format("%Y%m%d%H%M%S"),
            self.run_id
        )
    }

    /// Persist the journal under `dir`, creating the directory if needed
    #[instrument(skip(self), fields(run_id = %self.run_id))]
    pub async fn persist(&self, dir: &Path) -> Result<PathBuf, RollbackError> {
        tokio::fs::create_dir_all(dir).await.map_err(|source| RollbackError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = dir.join(self.file_name());
        let json = serde_json::to_vec_pretty(self).map_err(|source| RollbackError::Malformed {
            path: path.clone(),
            source,
        })?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|source| RollbackError::Io {
                path: path.clone(),
                source,
            })?;
        info!(
            run_id = %self.run_id,
            path = %path.display(),
            artifacts = self.artifact_count(),
            "Persisted rollback journal"
        );
        Ok(path)
    }

    /// Load a journal from a specific path
    pub async fn load(path: &Path) -> Result<Self, RollbackError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| RollbackError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| RollbackError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Find the most recently started journal in `dir`
    pub async fn latest(dir: &Path) -> Result<Option<(PathBuf, Self)>, RollbackError> {
        let mut read_dir = match tokio::fs::read_dir(dir).await {
            Ok(rd) => rd,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(RollbackError::Io {
                    path: dir.to_path_buf(),
                    source,
                })
            }
        };
        let mut newest: Option<(PathBuf, Self)> = None;
        while let Some(dir_entry) = read_dir.next_entry().await.map_err(|source| RollbackError::Io {
            path: dir.to_path_buf(),
            source,
        })? {
            let path = dir_entry.path();
            let name = dir_entry.file_name();
            let name = name.to_string_lossy();
            if !name.starts_with("journal-") || !name.ends_with(".json") {
                continue;
            }
            match Self::load(&path).await {
                Ok(journal) => {
                    let newer = newest
                        .as_ref()
                        .map_or(true, |(_, best)| journal.started_at > best.started_at);
                    if newer {
                        newest = Some((path, journal));
                    }
                }
                Err(error) => {
                    warn!(path = %path.display(), %error, "Skipping unreadable journal");
                }
            }
        }
        Ok(newest)
    }
}

/// Outcome of one rollback sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackReport {
    pub run_id: Uuid,
    pub journal_path: PathBuf,
    /// Files actually deleted
    pub files_removed: usize,
    /// Paths that were already gone
    pub already_absent: usize,
    /// Human-readable deletion failures, one per path
    pub failures: Vec<String>,
    /// Whether the journal file itself was removed (only after a clean sweep)
    pub journal_removed: bool,
}

/// Reverses runs from their persisted journals
#[derive(Debug, Clone)]
pub struct RollbackManager {
    journal_dir: PathBuf,
}

impl RollbackManager {
    pub fn new(journal_dir: impl Into<PathBuf>) -> Self {
        Self {
            journal_dir: journal_dir.into(),
        }
    }

    pub fn journal_dir(&self) -> &Path {
        &self.journal_dir
    }

    /// Roll back the most recently persisted run.
    ///
    /// Deletes recorded artifacts in reverse completion order. The journal
    /// file is removed only when every deletion either succeeded or found
    /// the file already absent.
    #[instrument(skip(self))]
    pub async fn rollback_latest(&self) -> Result<RollbackReport, RollbackError> {
        let (path, journal) = RollbackJournal::latest(&self.journal_dir)
            .await?
            .ok_or_else(|| RollbackError::NoJournal {
                dir: self.journal_dir.clone(),
            })?;
        self.rollback_journal(path, journal).await
    }

    async fn rollback_journal(
        &self,
        journal_path: PathBuf,
        journal: RollbackJournal,
    ) -> Result<RollbackReport, RollbackError> {
        let mut report = RollbackReport {
            run_id: journal.run_id,
            journal_path: journal_path.clone(),
            files_removed: 0,
            already_absent: 0,
            failures: Vec::new(),
            journal_removed: false,
        };

        for entry in journal.entries.iter().rev() {
            for artifact in entry.artifacts.iter().rev() {
                match tokio::fs::remove_file(artifact).await {
                    Ok(()) => {
                        debug!(unit = %entry.unit, path = %artifact.display(), "Removed artifact");
                        report.files_removed += 1;
                    }
                    Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                        report.already_absent += 1;
                    }
                    Err(error) => {
                        warn!(
                            unit = %entry.unit,
                            path = %artifact.display(),
                            %error,
                            "Failed to remove artifact during rollback"
                        );
                        report
                            .failures
                            .push(format!("{}: {error}", artifact.display()));
                    }
                }
            }
        }

        if report.failures.is_empty() {
            match tokio::fs::remove_file(&journal_path).await {
                Ok(()) => report.journal_removed = true,
                Err(error) => {
                    warn!(path = %journal_path.display(), %error, "Failed to remove journal file");
                    report
                        .failures
                        .push(format!("{}: {error}", journal_path.display()));
                }
            }
        }

        info!(
            run_id = %report.run_id,
            files_removed = report.files_removed,
            already_absent = report.already_absent,
            failures = report.failures.len(),
            "Rollback complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_journal_detection() {
        let mut journal = RollbackJournal::new(Uuid::new_v4(), json!({}));
        assert!(journal.is_empty());
        journal.record("model", Vec::new());
        assert!(journal.is_empty());
        journal.record("views", vec![PathBuf::from("v.rs")]);
        assert!(!journal.is_empty());
        assert_eq!(journal.artifact_count(), 1);
    }

    #[tokio::test]
    async fn test_persist_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut journal = RollbackJournal::new(Uuid::new_v4(), json!({"units": ["model"]}));
        journal.record("model", vec![PathBuf::from("app/models/post.rs")]);

        let path = journal.persist(dir.path()).await.unwrap();
        let loaded = RollbackJournal::load(&path).await.unwrap();
        assert_eq!(loaded.run_id, journal.run_id);
        assert_eq!(loaded.entries, journal.entries);
    }

    #[tokio::test]
    async fn test_latest_picks_newest_journal() {
        let dir = tempfile::tempdir().unwrap();
        let mut older = RollbackJournal::new(Uuid::new_v4(), json!({}));
        older.started_at = Utc::now() - chrono::Duration::minutes(5);
        older.record("model", vec![PathBuf::from("old.rs")]);
        older.persist(dir.path()).await.unwrap();

        let mut newer = RollbackJournal::new(Uuid::new_v4(), json!({}));
        newer.record("views", vec![PathBuf::from("new.rs")]);
        newer.persist(dir.path()).await.unwrap();

        let (_, found) = RollbackJournal::latest(dir.path()).await.unwrap().unwrap();
        assert_eq!(found.run_id, newer.run_id);
    }

    #[tokio::test]
    async fn test_latest_on_missing_dir_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("never-created");
        assert!(RollbackJournal::latest(&missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rollback_missing_artifact_counts_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let journal_dir = dir.path().join("journals");
        let real = dir.path().join("real.rs");
        tokio::fs::write(&real, "pub struct Post;").await.unwrap();

        let mut journal = RollbackJournal::new(Uuid::new_v4(), json!({}));
        journal.record("model", vec![real.clone(), dir.path().join("ghost.rs")]);
        journal.persist(&journal_dir).await.unwrap();

        let report = RollbackManager::new(&journal_dir)
            .rollback_latest()
            .await
            .unwrap();
        assert_eq!(report.files_removed, 1);
        assert_eq!(report.already_absent, 1);
        assert!(report.failures.is_empty());
        assert!(report.journal_removed);
        assert!(!real.exists());
    }

    #[tokio::test]
    async fn test_rollback_without_journal_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = RollbackManager::new(dir.path()).rollback_latest().await;
        assert!(matches!(err, Err(RollbackError::NoJournal { .. })));
    }
}
