use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RunnerError;

use super::descriptor::RunDescriptor;

/// Request to terminate a job previously started by a backend.
///
/// `process_handle` is whatever that backend's `execute` returned: a PID for
/// nextflow, always empty for float.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopRequest {
    pub process_handle: String,
    pub backend_name: String,
}

/// An execution backend.
///
/// `execute` returns as soon as the job is handed off; the work it starts is
/// tracked by the backend and only observable through the log relay.
#[async_trait]
pub trait Runner: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self, run: RunDescriptor, run_name: &str) -> Result<String, RunnerError>;

    async fn stop(&self, req: &StopRequest) -> Result<(), RunnerError>;

    fn bin_path(&self) -> &str;
}
