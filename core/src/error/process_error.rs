// core/src/error/process_error.rs
use thiserror::Error;

/// Failures of the graceful-then-forced termination protocol, one variant per stage.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to find process with PID {pid}")]
    NotFound { pid: i32 },

    #[error("failed to send SIGTERM to process {pid}: {reason}")]
    SignalFailed { pid: i32, reason: String },

    #[error("error waiting for process {pid} to exit: {reason}")]
    WaitFailed { pid: i32, reason: String },

    #[error("failed to kill process with PID {pid}: {reason}")]
    ForceKillFailed { pid: i32, reason: String },
}
