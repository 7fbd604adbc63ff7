// core/src/error/runner_error.rs
use thiserror::Error;

use super::{ProcessError, PublishError};

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("could not find executor: {0}")]
    UnknownExecutor(String),

    #[error("failed to launch process: {program}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to prepare run workspace")]
    Workspace(#[source] std::io::Error),

    #[error("dry run failed: {output}")]
    Validation { output: String },

    #[error("invalid process ID: {0}")]
    InvalidHandle(String),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("{key} not set")]
    ConfigurationMissing { key: String },

    #[error("submission template rejected: {0}")]
    Template(String),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("run name must not be empty")]
    EmptyRunName,

    #[error("cancelled")]
    Cancelled,
}
