//! # Dependency Resolver
//!
//! Turns a set of requested units plus a static dependency matrix into a
//! validated, topologically ordered [`ExecutionPlan`].
//!
//! ## Two-tier dependency semantics
//!
//! The matrix itself is soft: a declared dependency on a unit absent from
//! the request is silently pruned, never an error. Hard requirements and
//! recommendations live as declarative metadata on each unit type and are
//! enforced by the separate [`DependencyResolver::validate_request`] pass,
//! which collects every problem before execution starts.
//!
//! ## Ordering
//!
//! Resolution uses Kahn's algorithm with a FIFO frontier seeded in request
//! order, so ties between mutually independent units break deterministically
//! by insertion order. A cycle among the requested units fails resolution
//! outright; no partial order is ever returned.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use tracing::{debug, instrument, warn};

use crate::constants::{default_unit_definitions, UnitDefinition};
use crate::orchestration::errors::PlanningError;
use crate::orchestration::execution_plan::ExecutionPlan;
use crate::orchestration::types::{ResolvedUnit, UnitDeclaration};

/// Static type-level dependency matrix plus requirement metadata.
///
/// Always an explicitly constructed value passed into the resolver, so
/// concurrent or test runs cannot interfere through shared state.
#[derive(Debug, Clone, Default)]
pub struct DependencyMatrix {
    declared: BTreeMap<String, BTreeSet<String>>,
    required: BTreeMap<String, BTreeSet<String>>,
    recommended: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyMatrix {
    /// Empty matrix with no edges
    pub fn new() -> Self {
        Self::default()
    }

    /// Matrix pre-populated with the built-in unit catalog
    pub fn builtin() -> Self {
        let mut matrix = Self::new();
        for definition in default_unit_definitions() {
            matrix.insert_definition(&definition);
        }
        matrix
    }

    /// Merge one unit definition's edges into the matrix. Required
    /// dependencies are ordering edges too, whether or not they were also
    /// listed in `depends_on`.
    pub fn insert_definition(&mut self, definition: &UnitDefinition) {
        let row = self.declared.entry(definition.name.clone()).or_default();
        row.extend(definition.depends_on.iter().cloned());
        row.extend(definition.required.iter().cloned());
        self.required
            .entry(definition.name.clone())
            .or_default()
            .extend(definition.required.iter().cloned());
        self.recommended
            .entry(definition.name.clone())
            .or_default()
            .extend(definition.recommended.iter().cloned());
    }

    /// Add a single soft ordering edge
    pub fn add_dependency(&mut self, unit: impl Into<String>, dependency: impl Into<String>) {
        self.declared
            .entry(unit.into())
            .or_default()
            .insert(dependency.into());
    }

    /// Remove a soft ordering edge along with any requirement metadata for it
    pub fn remove_dependency(&mut self, unit: &str, dependency: &str) {
        if let Some(row) = self.declared.get_mut(unit) {
            row.remove(dependency);
        }
        if let Some(row) = self.required.get_mut(unit) {
            row.remove(dependency);
        }
        if let Some(row) = self.recommended.get_mut(unit) {
            row.remove(dependency);
        }
    }

    /// Mark a dependency as strictly required (validated pre-flight)
    pub fn add_required_dependency(
        &mut self,
        unit: impl Into<String>,
        dependency: impl Into<String>,
    ) {
        let unit = unit.into();
        let dependency = dependency.into();
        self.declared
            .entry(unit.clone())
            .or_default()
            .insert(dependency.clone());
        self.required.entry(unit).or_default().insert(dependency);
    }

    /// Declared dependencies for a unit; unknown units have none
    pub fn declared_for(&self, unit: &str) -> BTreeSet<String> {
        self.declared.get(unit).cloned().unwrap_or_default()
    }

    /// Strictly required dependencies for a unit
    pub fn required_for(&self, unit: &str) -> BTreeSet<String> {
        self.required.get(unit).cloned().unwrap_or_default()
    }

    /// Recommended dependencies for a unit
    pub fn recommended_for(&self, unit: &str) -> BTreeSet<String> {
        self.recommended.get(unit).cloned().unwrap_or_default()
    }
}

/// Outcome of the pre-flight validation pass: every problem collected in
/// one sweep so the caller can display them all at once
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<PlanningError>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Dependency-aware planner over an explicit [`DependencyMatrix`]
#[derive(Debug, Clone, Default)]
pub struct DependencyResolver {
    matrix: DependencyMatrix,
}

impl DependencyResolver {
    pub fn new(matrix: DependencyMatrix) -> Self {
        Self { matrix }
    }

    pub fn matrix(&self) -> &DependencyMatrix {
        &self.matrix
    }

    pub fn matrix_mut(&mut self) -> &mut DependencyMatrix {
        &mut self.matrix
    }

    /// Pre-flight validation: duplicate names, unmet required dependencies
    /// (errors), and unmet recommended dependencies (warnings)
    #[instrument(skip(self, declarations), fields(requested = declarations.len()))]
    pub fn validate_request(&self, declarations: &[UnitDeclaration]) -> ValidationReport {
        let mut report = ValidationReport::default();
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let requested: BTreeSet<&str> = declarations.iter().map(|d| d.name.as_str()).collect();

        for declaration in declarations {
            if !seen.insert(declaration.name.as_str()) {
                report.errors.push(PlanningError::DuplicateUnit {
                    unit: declaration.name.clone(),
                });
                continue;
            }
            for dependency in self.matrix.required_for(&declaration.name) {
                if !requested.contains(dependency.as_str()) {
                    report.errors.push(PlanningError::UnresolvedDependency {
                        unit: declaration.name.clone(),
                        dependency,
                    });
                }
            }
            for dependency in self.matrix.recommended_for(&declaration.name) {
                if !requested.contains(dependency.as_str()) {
                    warn!(
                        unit = %declaration.name,
                        dependency = %dependency,
                        "Recommended dependency not in requested set"
                    );
                    report.warnings.push(format!(
                        "unit '{}' usually pairs with '{}', which is not requested",
                        declaration.name, dependency
                    ));
                }
            }
        }
        report
    }

    /// Resolve the requested units into a topologically ordered plan.
    ///
    /// Dependencies on units outside the request are pruned. Fails with
    /// [`PlanningError::CircularDependency`] if the restricted matrix has a
    /// cycle, naming the units that could not be ordered.
    #[instrument(skip(self, declarations), fields(requested = declarations.len()))]
    pub fn resolve(
        &self,
        declarations: Vec<UnitDeclaration>,
    ) -> Result<ExecutionPlan, PlanningError> {
        let names: Vec<String> = declarations.iter().map(|d| d.name.clone()).collect();
        let index_of: HashMap<&str, usize> = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i))
            .collect();

        // Restrict declared edges to the requested set
        let resolved_deps: Vec<BTreeSet<String>> = names
            .iter()
            .map(|name| {
                self.matrix
                    .declared_for(name)
                    .into_iter()
                    .filter(|dep| index_of.contains_key(dep.as_str()))
                    .collect()
            })
            .collect();

        let mut in_degree: Vec<usize> = resolved_deps.iter().map(BTreeSet::len).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); names.len()];
        for (i, deps) in resolved_deps.iter().enumerate() {
            for dep in deps {
                dependents[index_of[dep.as_str()]].push(i);
            }
        }

        // Kahn's algorithm, FIFO frontier seeded in request order
        let mut frontier: VecDeque<usize> = (0..names.len()).filter(|i| in_degree[*i] == 0).collect();
        let mut ordered: Vec<usize> = Vec::with_capacity(names.len());
        while let Some(i) = frontier.pop_front() {
            ordered.push(i);
            for &dependent in &dependents[i] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    frontier.push_back(dependent);
                }
            }
        }

        if ordered.len() != names.len() {
            let remaining: Vec<String> = (0..names.len())
                .filter(|i| !ordered.contains(i))
                .map(|i| names[i].clone())
                .collect();
            return Err(PlanningError::CircularDependency { remaining });
        }

        let mut declarations: Vec<Option<UnitDeclaration>> =
            declarations.into_iter().map(Some).collect();
        let mut resolved_deps: Vec<Option<BTreeSet<String>>> =
            resolved_deps.into_iter().map(Some).collect();

        let units: Vec<ResolvedUnit> = ordered
            .iter()
            .enumerate()
            .map(|(rank, &i)| {
                let declaration = declarations[i].take().unwrap_or_else(|| {
                    unreachable!("unit index visited twice during ordering")
                });
                let resolved = resolved_deps[i].take().unwrap_or_default();
                debug!(
                    unit = %declaration.name,
                    order = rank + 1,
                    dependencies = ?resolved,
                    "Resolved unit"
                );
                ResolvedUnit {
                    order: u32::try_from(rank + 1).unwrap_or(u32::MAX),
                    declared_dependencies: self.matrix.declared_for(&declaration.name),
                    resolved_dependencies: resolved,
                    declaration,
                }
            })
            .collect();

        Ok(ExecutionPlan::new(units))
    }

    /// Longest chain through the restricted dependency DAG, by unit count.
    /// Returns the chain from root to leaf.
    pub fn critical_path(&self, declarations: &[UnitDeclaration]) -> Vec<String> {
        let requested: BTreeSet<&str> = declarations.iter().map(|d| d.name.as_str()).collect();
        let mut memo: HashMap<String, Vec<String>> = HashMap::new();
        let mut best: Vec<String> = Vec::new();
        for declaration in declarations {
            let chain = self.longest_chain_to(&declaration.name, &requested, &mut memo);
            if chain.len() > best.len() {
                best = chain;
            }
        }
        best
    }

    fn longest_chain_to(
        &self,
        unit: &str,
        requested: &BTreeSet<&str>,
        memo: &mut HashMap<String, Vec<String>>,
    ) -> Vec<String> {
        if let Some(chain) = memo.get(unit) {
            return chain.clone();
        }
        // Cycle guard: mark in-progress nodes with an empty entry
        memo.insert(unit.to_string(), Vec::new());
        let mut best: Vec<String> = Vec::new();
        for dep in self.matrix.declared_for(unit) {
            if !requested.contains(dep.as_str()) {
                continue;
            }
            let chain = self.longest_chain_to(&dep, requested, memo);
            if chain.len() > best.len() {
                best = chain;
            }
        }
        best.push(unit.to_string());
        memo.insert(unit.to_string(), best.clone());
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::units;
    use proptest::prelude::*;

    fn declarations(names: &[&str]) -> Vec<UnitDeclaration> {
        names
            .iter()
            .map(|n| UnitDeclaration::simple(n, true))
            .collect()
    }

    #[test]
    fn test_simple_chain_orders_model_controller_views() {
        let mut matrix = DependencyMatrix::new();
        matrix.add_dependency("controller", "model");
        matrix.add_dependency("views", "model");
        matrix.add_dependency("views", "controller");
        let resolver = DependencyResolver::new(matrix);

        let plan = resolver
            .resolve(declarations(&["views", "controller", "model"]))
            .unwrap();
        let ordered: Vec<(&str, u32)> = plan.units().iter().map(|u| (u.name(), u.order)).collect();
        assert_eq!(
            ordered,
            vec![("model", 1), ("controller", 2), ("views", 3)]
        );
    }

    #[test]
    fn test_cycle_fails_without_partial_order() {
        let mut matrix = DependencyMatrix::new();
        matrix.add_dependency("a", "b");
        matrix.add_dependency("b", "a");
        let resolver = DependencyResolver::new(matrix);

        let err = resolver.resolve(declarations(&["a", "b"])).unwrap_err();
        match err {
            PlanningError::CircularDependency { remaining } => {
                assert_eq!(remaining.len(), 2);
            }
            other => panic!("expected CircularDependency, got {other:?}"),
        }
    }

    #[test]
    fn test_dependency_on_absent_unit_is_pruned() {
        let resolver = DependencyResolver::new(DependencyMatrix::builtin());
        let plan = resolver
            .resolve(declarations(&[units::CONTROLLER]))
            .unwrap();
        let controller = &plan.units()[0];
        assert!(controller
            .declared_dependencies
            .contains(units::MODEL));
        assert!(controller.resolved_dependencies.is_empty());
    }

    #[test]
    fn test_independent_units_keep_request_order() {
        let resolver = DependencyResolver::new(DependencyMatrix::new());
        let plan = resolver
            .resolve(declarations(&[units::MODEL, units::MIGRATION]))
            .unwrap();
        let orders: Vec<u32> = plan.units().iter().map(|u| u.order).collect();
        assert_eq!(orders, vec![1, 2]);
        assert_eq!(plan.parallel_groups().len(), 1);
        assert_eq!(plan.parallel_groups()[0].len(), 2);
    }

    #[test]
    fn test_validation_reports_required_dependency_errors() {
        let resolver = DependencyResolver::new(DependencyMatrix::builtin());
        let report = resolver.validate_request(&declarations(&[units::CONTROLLER]));
        assert!(!report.is_ok());
        assert!(matches!(
            &report.errors[0],
            PlanningError::UnresolvedDependency { unit, dependency }
                if unit == units::CONTROLLER && dependency == units::MODEL
        ));
    }

    #[test]
    fn test_validation_warns_on_recommended_dependency() {
        let resolver = DependencyResolver::new(DependencyMatrix::builtin());
        let report =
            resolver.validate_request(&declarations(&[units::MODEL, units::VIEWS]));
        assert!(report.is_ok());
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains(units::CONTROLLER)));
    }

    #[test]
    fn test_validation_collects_every_problem_in_one_pass() {
        let resolver = DependencyResolver::new(DependencyMatrix::builtin());
        let mut request = declarations(&[units::CONTROLLER]);
        request.push(UnitDeclaration::simple(units::CONTROLLER, true));
        let report = resolver.validate_request(&request);
        assert_eq!(report.errors.len(), 2);
    }

    #[test]
    fn test_remove_dependency_clears_requirement_metadata() {
        let mut matrix = DependencyMatrix::builtin();
        matrix.remove_dependency(units::CONTROLLER, units::MODEL);
        let resolver = DependencyResolver::new(matrix);
        let report = resolver.validate_request(&declarations(&[units::CONTROLLER]));
        assert!(report.is_ok());
    }

    #[test]
    fn test_critical_path_through_builtin_matrix() {
        let resolver = DependencyResolver::new(DependencyMatrix::builtin());
        let request = declarations(&[units::MODEL, units::CONTROLLER, units::VIEWS]);
        let path = resolver.critical_path(&request);
        assert_eq!(
            path,
            vec![
                units::MODEL.to_string(),
                units::CONTROLLER.to_string(),
                units::VIEWS.to_string()
            ]
        );
    }

    proptest! {
        /// Every dependency of a resolved unit appears earlier in the order,
        /// for arbitrary forward-edged matrices over a pool of unit names.
        #[test]
        fn prop_resolved_plans_are_topologically_valid(
            edges in proptest::collection::vec((0usize..8, 0usize..8), 0..24),
            requested in proptest::collection::btree_set(0usize..8, 1..8),
        ) {
            let pool: Vec<String> = (0..8).map(|i| format!("unit{i}")).collect();
            let mut matrix = DependencyMatrix::new();
            for (from, to) in edges {
                // Only forward edges so the matrix stays acyclic
                if from < to {
                    matrix.add_dependency(pool[to].clone(), pool[from].clone());
                }
            }
            let resolver = DependencyResolver::new(matrix);
            let request: Vec<UnitDeclaration> = requested
                .iter()
                .map(|i| UnitDeclaration::simple(&pool[*i], false))
                .collect();

            let plan = resolver.resolve(request).unwrap();
            let order_of: std::collections::HashMap<&str, u32> = plan
                .units()
                .iter()
                .map(|u| (u.name(), u.order))
                .collect();
            for unit in plan.units() {
                for dep in &unit.resolved_dependencies {
                    prop_assert!(order_of[dep.as_str()] < unit.order);
                }
            }
        }
    }
}
