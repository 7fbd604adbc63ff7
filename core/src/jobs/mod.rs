//! Request-level orchestration: validate, dispatch, terminate, stream.

mod service;
mod types;

pub use service::JobService;
pub use types::{ExecutorSpec, RunRequest, RunResponse, TerminateRequest};
