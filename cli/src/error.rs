use thiserror::Error;

use shard_core::error::{ConfigError, RunnerError};

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("invalid parameter '{0}': expected KEY=VALUE")]
    InvalidParam(String),

    #[error("failed to read {path}")]
    ReadOverride {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write output")]
    Output(#[source] std::io::Error),
}
