//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `shard_core::api` instead of reaching into internal modules.

pub use crate::config::{
    AppConfig, BackendKind, EnvSource, FloatConfig, LoggingConfig, MapEnv, NextflowConfig, ProcessEnv,
};
pub use crate::context::AppContext;
pub use crate::error::{ConfigError, ProcessError, PublishError, RunnerError};
pub use crate::jobs::{ExecutorSpec, JobService, RunRequest, RunResponse, TerminateRequest};
pub use crate::logstream::{LogBus, LogRecord, LogRelay};
pub use crate::runner::{
    DryRunValidator, Parameter, ProcessController, RunDescriptor, RunWorkspace, Runner,
    RunnerRegistry, StopOutcome, StopRequest, ValidationOutcome,
};
