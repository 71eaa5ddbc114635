//! # Progress Tracker
//!
//! Turns coordinator lifecycle notifications into timing data, cumulative
//! statistics, and published events for external observers (a CLI progress
//! bar, a log sink).
//!
//! Every notification publishes one of the fixed events from
//! [`crate::constants::events`] carrying a [`ProgressSnapshot`]. Observers
//! subscribe through the shared [`EventPublisher`]; each holds its own
//! receiver, so one observer failing or falling behind never interrupts the
//! others or the run.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Instant;
use uuid::Uuid;

use crate::constants::events;
use crate::events::EventPublisher;
use crate::orchestration::types::{RunStatistics, RunStatus, UnitResult, UnitStatus};

/// Point-in-time view of run progress, attached to every published event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub total_units: usize,
    pub completed_units: usize,
    pub failed_units: usize,
    pub skipped_units: usize,
    /// `completed / total`, in percent
    pub percent_complete: f64,
    pub elapsed_ms: u64,
    /// Linear extrapolation; present only once at least one unit finished
    pub estimated_remaining_ms: Option<u64>,
    pub current_unit: Option<String>,
    pub files_generated: usize,
    pub files_skipped: usize,
}

#[derive(Debug, Default)]
struct TrackerState {
    completed_units: usize,
    failed_units: usize,
    skipped_units: usize,
    files_generated: usize,
    files_skipped: usize,
    current_unit: Option<String>,
    unit_started_at: Option<Instant>,
    unit_durations_ms: BTreeMap<String, u64>,
}

/// Observes the coordinator's lifecycle and exposes timings, statistics,
/// and progress events
#[derive(Debug)]
pub struct ProgressTracker {
    run_id: Uuid,
    total_units: usize,
    started_at: DateTime<Utc>,
    clock_started: Instant,
    publisher: EventPublisher,
    state: Mutex<TrackerState>,
}

impl ProgressTracker {
    pub fn new(run_id: Uuid, total_units: usize, publisher: EventPublisher) -> Self {
        Self {
            run_id,
            total_units,
            started_at: Utc::now(),
            clock_started: Instant::now(),
            publisher,
            state: Mutex::new(TrackerState::default()),
        }
    }

    /// Publisher observers subscribe through
    pub fn publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    pub fn run_started(&self) {
        self.publish(events::RUN_STARTED, None);
    }

    pub fn unit_started(&self, unit: &str) {
        {
            let mut state = self.state.lock();
            state.current_unit = Some(unit.to_string());
            state.unit_started_at = Some(Instant::now());
        }
        self.publish(events::UNIT_STARTED, Some(unit));
    }

    /// Record a finished unit (success or skip) and publish `unit_completed`
    pub fn unit_completed(&self, unit: &str, result: &UnitResult) {
        {
            let mut state = self.state.lock();
            match result.status {
                UnitStatus::Skipped => state.skipped_units += 1,
                _ => state.completed_units += 1,
            }
            state.files_generated += result.produced_artifacts.len();
            state.files_skipped += result.skipped_artifacts.len();
            Self::close_unit(&mut state, unit);
        }
        self.publish(events::UNIT_COMPLETED, Some(unit));
    }

    /// Record a failed unit and publish `unit_failed`
    pub fn unit_failed(&self, unit: &str, result: &UnitResult) {
        {
            let mut state = self.state.lock();
            state.failed_units += 1;
            Self::close_unit(&mut state, unit);
        }
        let snapshot = self.snapshot();
        self.publisher.publish(
            events::UNIT_FAILED,
            json!({
                "unit": unit,
                "error": result.error,
                "snapshot": snapshot,
            }),
        );
    }

    /// Publish the terminal event for the run
    pub fn run_finished(&self, status: RunStatus) {
        {
            let mut state = self.state.lock();
            state.current_unit = None;
            state.unit_started_at = None;
        }
        let event = if status == RunStatus::Failure {
            events::RUN_FAILED
        } else {
            events::RUN_COMPLETED
        };
        let snapshot = self.snapshot();
        self.publisher
            .publish(event, json!({ "status": status, "snapshot": snapshot }));
    }

    fn close_unit(state: &mut TrackerState, unit: &str) {
        if let Some(started) = state.unit_started_at.take() {
            let ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            state.unit_durations_ms.insert(unit.to_string(), ms);
        }
        state.current_unit = None;
    }

    /// Current progress, including percent complete and the linear ETA
    pub fn snapshot(&self) -> ProgressSnapshot {
        let state = self.state.lock();
        let elapsed_ms = u64::try_from(self.clock_started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let finished = state.completed_units + state.skipped_units + state.failed_units;
        let percent_complete = if self.total_units == 0 {
            100.0
        } else {
            (finished as f64 / self.total_units as f64) * 100.0
        };
        // Linear extrapolation, meaningful only after the first finished unit
        let estimated_remaining_ms = if finished > 0 && self.total_units > finished {
            Some(elapsed_ms / finished as u64 * (self.total_units - finished) as u64)
        } else {
            None
        };
        ProgressSnapshot {
            run_id: self.run_id,
            started_at: self.started_at,
            total_units: self.total_units,
            completed_units: state.completed_units,
            failed_units: state.failed_units,
            skipped_units: state.skipped_units,
            percent_complete,
            elapsed_ms,
            estimated_remaining_ms,
            current_unit: state.current_unit.clone(),
            files_generated: state.files_generated,
            files_skipped: state.files_skipped,
        }
    }

    /// Per-unit duration breakdown as run statistics
    pub fn statistics(&self) -> RunStatistics {
        let state = self.state.lock();
        RunStatistics {
            units_total: self.total_units,
            units_completed: state.completed_units,
            units_failed: state.failed_units,
            units_skipped: state.skipped_units,
            files_generated: state.files_generated,
            files_skipped: state.files_skipped,
            total_duration_ms: u64::try_from(self.clock_started.elapsed().as_millis())
                .unwrap_or(u64::MAX),
            unit_durations_ms: state.unit_durations_ms.clone(),
        }
    }

    fn publish(&self, event: &str, unit: Option<&str>) {
        let snapshot = self.snapshot();
        self.publisher
            .publish(event, json!({ "unit": unit, "snapshot": snapshot }));
    }
}
