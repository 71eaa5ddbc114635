//! # Generator Registry
//!
//! Thread-safe registration and lookup of the generators the coordinator
//! invokes. Generators are registered once at startup (or per test) and
//! resolved by unit name during execution.
//!
//! A missing generator is not a registry error: the coordinator converts it
//! into a failure `UnitResult` for that unit, so criticality decides whether
//! the run halts.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::orchestration::types::Generator;

/// Name-keyed registry of generator implementations
#[derive(Default)]
pub struct GeneratorRegistry {
    generators: RwLock<HashMap<String, Arc<dyn Generator>>>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a generator under its own name, replacing any previous
    /// registration for that name
    pub async fn register(&self, generator: Arc<dyn Generator>) {
        let name = generator.name().to_string();
        let mut generators = self.generators.write().await;
        if generators.insert(name.clone(), generator).is_some() {
            warn!(generator = %name, "Replacing previously registered generator");
        } else {
            info!(generator = %name, "Registered generator");
        }
    }

    /// Resolve a generator by unit name
    pub async fn get(&self, name: &str) -> Option<Arc<dyn Generator>> {
        let generators = self.generators.read().await;
        let found = generators.get(name).cloned();
        debug!(generator = %name, found = found.is_some(), "Resolved generator");
        found
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.generators.read().await.contains_key(name)
    }

    /// Registered generator names, sorted
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.generators.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn len(&self) -> usize {
        self.generators.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.generators.read().await.is_empty()
    }
}

impl std::fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorRegistry").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::errors::GeneratorError;
    use crate::orchestration::types::UnitResult;
    use async_trait::async_trait;
    use serde_json::Value;

    struct NoopGenerator {
        name: &'static str,
    }

    #[async_trait]
    impl Generator for NoopGenerator {
        fn name(&self) -> &str {
            self.name
        }

        async fn generate(
            &self,
            _parameters: &HashMap<String, Value>,
        ) -> Result<UnitResult, GeneratorError> {
            Ok(UnitResult::success(Vec::new(), Vec::new()))
        }
    }

    #[tokio::test]
    async fn test_register_and_resolve() {
        let registry = GeneratorRegistry::new();
        registry
            .register(Arc::new(NoopGenerator { name: "model" }))
            .await;
        assert!(registry.contains("model").await);
        assert!(registry.get("model").await.is_some());
        assert!(registry.get("views").await.is_none());
    }

    #[tokio::test]
    async fn test_reregistration_replaces() {
        let registry = GeneratorRegistry::new();
        registry
            .register(Arc::new(NoopGenerator { name: "model" }))
            .await;
        registry
            .register(Arc::new(NoopGenerator { name: "model" }))
            .await;
        assert_eq!(registry.len().await, 1);
        assert_eq!(registry.names().await, vec!["model".to_string()]);
    }
}
