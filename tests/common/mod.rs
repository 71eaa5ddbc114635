//! Shared test generators used by the integration suites.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;

use scaffold_core::orchestration::errors::GeneratorError;
use scaffold_core::orchestration::types::{Generator, UnitResult};

/// Generator that writes one real file per invocation and records the order
/// it was invoked in.
pub struct FileGenerator {
    name: String,
    output: PathBuf,
    invocations: Arc<Mutex<Vec<String>>>,
}

impl FileGenerator {
    pub fn new(name: &str, dir: &Path, invocations: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.to_string(),
            output: dir.join(format!("{name}.rs")),
            invocations,
        }
    }
}

#[async_trait]
impl Generator for FileGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        _parameters: &HashMap<String, Value>,
    ) -> Result<UnitResult, GeneratorError> {
        self.invocations.lock().unwrap().push(self.name.clone());
        tokio::fs::write(&self.output, format!("// generated {}\n", self.name))
            .await
            .map_err(|e| GeneratorError::Failed {
                generator: self.name.clone(),
                reason: e.to_string(),
            })?;
        Ok(UnitResult::success(vec![self.output.clone()], Vec::new()))
    }

    fn expected_artifacts(&self, _parameters: &HashMap<String, Value>) -> Vec<PathBuf> {
        vec![self.output.clone()]
    }
}

/// Generator that always fails, recording that it ran.
pub struct FailingGenerator {
    name: String,
    invocations: Arc<Mutex<Vec<String>>>,
}

impl FailingGenerator {
    pub fn new(name: &str, invocations: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.to_string(),
            invocations,
        }
    }
}

#[async_trait]
impl Generator for FailingGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        _parameters: &HashMap<String, Value>,
    ) -> Result<UnitResult, GeneratorError> {
        self.invocations.lock().unwrap().push(self.name.clone());
        Err(GeneratorError::Failed {
            generator: self.name.clone(),
            reason: "simulated generator failure".to_string(),
        })
    }
}
