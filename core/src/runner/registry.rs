use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::RunnerError;

use super::descriptor::RunDescriptor;
use super::traits::{Runner, StopRequest};

/// Executor name → backend, resolved once at startup.
///
/// Several names may share one backend (e.g. `awsbatch` and `google-batch`
/// both run the engine directly).
#[derive(Default, Clone)]
pub struct RunnerRegistry {
    runners: BTreeMap<String, Arc<dyn Runner>>,
}

impl RunnerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, executor: impl Into<String>, runner: Arc<dyn Runner>) {
        self.runners.insert(executor.into(), runner);
    }

    pub fn with(mut self, executor: impl Into<String>, runner: Arc<dyn Runner>) -> Self {
        self.register(executor, runner);
        self
    }

    pub fn resolve(&self, executor: &str) -> Result<Arc<dyn Runner>, RunnerError> {
        self.runners
            .get(executor)
            .cloned()
            .ok_or_else(|| RunnerError::UnknownExecutor(executor.to_string()))
    }

    pub fn executors(&self) -> impl Iterator<Item = &str> {
        self.runners.keys().map(String::as_str)
    }

    pub async fn execute(
        &self,
        executor: &str,
        run: RunDescriptor,
        run_name: &str,
    ) -> Result<String, RunnerError> {
        let runner = self.resolve(executor)?;
        tracing::info!(executor = %executor, backend = runner.name(), run_name = %run_name, "job starting");
        runner.execute(run, run_name).await
    }

    pub async fn stop(&self, req: &StopRequest) -> Result<(), RunnerError> {
        let runner = self.resolve(&req.backend_name)?;
        runner.stop(req).await
    }
}
