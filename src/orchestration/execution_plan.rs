//! # Execution Plan
//!
//! The resolved, ordered collection of units plus derived views: timeline
//! levels, critical/optional subsets, parallelizable groups, and the
//! predicted artifact list used by dry-run previews.
//!
//! A plan is a pure data holder, read-only after construction. The only
//! behavior is computing views over the unit sequence and checking internal
//! consistency; validation problems come back as a list of human-readable
//! strings so a caller can display all of them at once.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

use crate::orchestration::types::ResolvedUnit;

/// Immutable, ordered execution plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    units: Vec<ResolvedUnit>,
    expected_artifacts: Vec<PathBuf>,
}

impl ExecutionPlan {
    /// Build a plan from resolver output, normalizing to ascending order
    pub fn new(mut units: Vec<ResolvedUnit>) -> Self {
        units.sort_by_key(|u| u.order);
        Self {
            units,
            expected_artifacts: Vec::new(),
        }
    }

    /// Clone-with-overrides used by the dry-run path to attach predicted
    /// artifact paths without touching the unit sequence
    #[must_use]
    pub fn with_expected_artifacts(mut self, artifacts: Vec<PathBuf>) -> Self {
        self.expected_artifacts = artifacts;
        self
    }

    pub fn units(&self) -> &[ResolvedUnit] {
        &self.units
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedUnit> {
        self.units.iter().find(|u| u.name() == name)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Paths the plan predicts it will produce
    pub fn expected_artifacts(&self) -> &[PathBuf] {
        &self.expected_artifacts
    }

    /// Units whose failure halts the run
    pub fn critical_units(&self) -> Vec<&ResolvedUnit> {
        self.units.iter().filter(|u| u.is_critical()).collect()
    }

    /// Units whose failure is recorded but does not halt the run
    pub fn optional_units(&self) -> Vec<&ResolvedUnit> {
        self.units.iter().filter(|u| !u.is_critical()).collect()
    }

    /// Internal consistency check. Returns one human-readable string per
    /// problem; an empty list means the plan is well-formed.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut seen_names: BTreeMap<&str, u32> = BTreeMap::new();
        let mut seen_orders: BTreeMap<u32, &str> = BTreeMap::new();

        for unit in &self.units {
            if unit.order == 0 {
                problems.push(format!("unit '{}' has order 0; orders start at 1", unit.name()));
            }
            if let Some(previous) = seen_names.insert(unit.name(), unit.order) {
                problems.push(format!(
                    "duplicate unit '{}' (orders {previous} and {})",
                    unit.name(),
                    unit.order
                ));
            }
            if let Some(holder) = seen_orders.insert(unit.order, unit.name()) {
                problems.push(format!(
                    "order {} assigned to both '{holder}' and '{}'",
                    unit.order,
                    unit.name()
                ));
            }
            if !unit
                .resolved_dependencies
                .iter()
                .all(|d| unit.declared_dependencies.contains(d))
            {
                problems.push(format!(
                    "unit '{}' resolved a dependency it never declared",
                    unit.name()
                ));
            }
        }

        for unit in &self.units {
            for dependency in &unit.resolved_dependencies {
                match seen_names.get(dependency.as_str()) {
                    None => problems.push(format!(
                        "unit '{}' depends on '{dependency}', which is not in the plan",
                        unit.name()
                    )),
                    Some(dep_order) if *dep_order >= unit.order => problems.push(format!(
                        "unit '{}' (order {}) depends on '{dependency}' (order {dep_order}), which does not run first",
                        unit.name(),
                        unit.order
                    )),
                    Some(_) => {}
                }
            }
        }
        problems
    }

    /// Units grouped into levels such that every unit in level `k` depends
    /// only on units in levels `< k`. Level numbering starts at 1.
    pub fn timeline(&self) -> Vec<Vec<&ResolvedUnit>> {
        let mut level_of: HashMap<&str, usize> = HashMap::new();
        let mut levels: Vec<Vec<&ResolvedUnit>> = Vec::new();
        // Units are already topologically ordered, so one forward pass works
        for unit in &self.units {
            let level = unit
                .resolved_dependencies
                .iter()
                .filter_map(|d| level_of.get(d.as_str()))
                .max()
                .map_or(0, |max| max + 1);
            level_of.insert(unit.name(), level);
            if levels.len() <= level {
                levels.resize_with(level + 1, Vec::new);
            }
            levels[level].push(unit);
        }
        levels
    }

    /// Units sharing a timeline level have no dependency relationship and
    /// are eligible for concurrent execution (reported for information only;
    /// execution stays sequential)
    pub fn parallel_groups(&self) -> Vec<Vec<&str>> {
        self.timeline()
            .iter()
            .map(|level| level.iter().map(|u| u.name()).collect())
            .collect()
    }

    /// Longest dependency chain in the plan, by unit count
    pub fn critical_path(&self) -> Vec<&str> {
        let mut chain_to: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut best: Vec<&str> = Vec::new();
        for unit in &self.units {
            let mut chain: Vec<&str> = unit
                .resolved_dependencies
                .iter()
                .filter_map(|d| chain_to.get(d.as_str()))
                .max_by_key(|c| c.len())
                .cloned()
                .unwrap_or_default();
            chain.push(unit.name());
            if chain.len() > best.len() {
                best = chain.clone();
            }
            chain_to.insert(unit.name(), chain);
        }
        best
    }

    /// Human-facing preview for the dry-run path
    pub fn preview(&self) -> PlanPreview {
        PlanPreview {
            rows: self
                .units
                .iter()
                .map(|unit| PreviewRow {
                    order: unit.order,
                    name: unit.name().to_string(),
                    command: unit.declaration.action.command.clone(),
                    dependencies: unit.resolved_dependencies.iter().cloned().collect(),
                })
                .collect(),
            expected_artifacts: self.expected_artifacts.clone(),
        }
    }
}

/// One row of the dry-run table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewRow {
    pub order: u32,
    pub name: String,
    pub command: String,
    pub dependencies: Vec<String>,
}

/// Tabular plan listing plus the flat predicted artifact list; the only
/// human-facing surface the core defines directly
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanPreview {
    pub rows: Vec<PreviewRow>,
    pub expected_artifacts: Vec<PathBuf>,
}

impl fmt::Display for PlanPreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<6} {:<14} {:<20} DEPENDENCIES", "ORDER", "UNIT", "COMMAND")?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<6} {:<14} {:<20} {}",
                row.order,
                row.name,
                row.command,
                if row.dependencies.is_empty() {
                    "-".to_string()
                } else {
                    row.dependencies.join(", ")
                }
            )?;
        }
        if !self.expected_artifacts.is_empty() {
            writeln!(f, "\nPredicted artifacts:")?;
            for path in &self.expected_artifacts {
                writeln!(f, "  {}", path.display())?;
            }
        }
        Ok(())
    }
}
