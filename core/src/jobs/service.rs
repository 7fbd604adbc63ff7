use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::RunnerError;
use crate::logstream::{LogRecord, LogRelay};
use crate::runner::{DryRunValidator, RunDescriptor, RunnerRegistry, StopRequest};

use super::types::{RunRequest, RunResponse, TerminateRequest};

/// What the transport layer calls into.
pub struct JobService {
    registry: RunnerRegistry,
    validator: Option<DryRunValidator>,
    relay: LogRelay,
}

impl JobService {
    /// `validator: None` disables rehearsals.
    pub fn new(registry: RunnerRegistry, validator: Option<DryRunValidator>, relay: LogRelay) -> Self {
        Self {
            registry,
            validator,
            relay,
        }
    }

    pub fn registry(&self) -> &RunnerRegistry {
        &self.registry
    }

    pub fn relay(&self) -> &LogRelay {
        &self.relay
    }

    /// Rehearses the run, then hands it to the executor's backend.
    ///
    /// `cancel` bounds only the rehearsal; once the backend accepted the run
    /// it keeps going regardless.
    pub async fn run(&self, req: RunRequest, cancel: &CancellationToken) -> Result<RunResponse, RunnerError> {
        tracing::debug!(run_name = %req.run_name, executor = %req.executor.name, "Received request to launch workflow");
        if req.run_name.trim().is_empty() {
            return Err(RunnerError::EmptyRunName);
        }

        // Unknown executors fail before any rehearsal work.
        self.registry.resolve(&req.executor.name)?;
        let run = RunDescriptor::new(req.pipeline_url, req.executor.compute_override)
            .with_parameters(&req.parameters)
            .with_run_name(&req.run_name);

        if let Some(validator) = &self.validator {
            validator.validate(&req.run_name, &run, cancel).await?;
        }

        let process_key = self
            .registry
            .execute(&req.executor.name, run, &req.run_name)
            .await?;
        tracing::info!(run_name = %req.run_name, process_id = %process_key, "process running");

        Ok(RunResponse {
            status: true,
            process_key,
            executor: req.executor.name,
            run_name: req.run_name,
        })
    }

    pub async fn terminate(&self, req: TerminateRequest) -> Result<bool, RunnerError> {
        tracing::debug!(executor = %req.executor, process_key = %req.process_key, "Received request to stop job");
        let stop = StopRequest {
            process_handle: req.process_key,
            backend_name: req.executor,
        };
        if let Err(err) = self.registry.stop(&stop).await {
            tracing::error!(error = %err, "stop process");
            return Err(err);
        }
        Ok(true)
    }

    /// Backlog then live records for `run_name`; `None` for an empty name.
    pub fn stream_logs(&self, run_name: &str, cancel: CancellationToken) -> Option<mpsc::Receiver<LogRecord>> {
        if run_name.is_empty() {
            return None;
        }
        Some(self.relay.stream(run_name, cancel))
    }
}
