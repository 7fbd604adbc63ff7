//! Graceful-then-forced termination of engine processes by PID.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;

use crate::error::ProcessError;

pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(15);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Exited after SIGTERM within the timeout.
    Graceful,
    /// Outlived the timeout and was SIGKILLed.
    ForceKilled,
}

type ExitState = Option<i32>;

/// Held by whoever owns the child handle; reports the exit so `graceful_stop`
/// does not have to reap a process it does not own.
pub struct ExitNotifier {
    tx: watch::Sender<ExitState>,
}

impl ExitNotifier {
    pub fn exited(self, code: i32) {
        let _ = self.tx.send(Some(code));
    }
}

pub struct ProcessController {
    stop_timeout: Duration,
    exits: Mutex<HashMap<i32, watch::Receiver<ExitState>>>,
}

impl ProcessController {
    pub fn new(stop_timeout: Duration) -> Self {
        Self {
            stop_timeout,
            exits: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a child we spawned. Entries of processes that already exited
    /// are pruned here.
    pub fn track(&self, pid: i32) -> ExitNotifier {
        let (tx, rx) = watch::channel(None);
        let mut exits = self.exits.lock().unwrap_or_else(PoisonError::into_inner);
        exits.retain(|_, rx| rx.borrow().is_none() && rx.has_changed().is_ok());
        exits.insert(pid, rx);
        ExitNotifier { tx }
    }

    fn watcher(&self, pid: i32) -> Option<watch::Receiver<ExitState>> {
        self.exits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&pid)
            .cloned()
    }

    /// SIGTERM, wait up to the stop timeout, then SIGKILL and wait until gone.
    pub async fn graceful_stop(&self, pid: i32) -> Result<StopOutcome, ProcessError> {
        let watcher = self.watcher(pid);
        if watcher.as_ref().is_some_and(|rx| rx.borrow().is_some()) {
            return Err(ProcessError::NotFound { pid });
        }
        sys::ensure_exists(pid)?;

        tracing::info!(target: "shard.process", pid, "sending SIGTERM");
        sys::terminate(pid)?;

        match tokio::time::timeout(self.stop_timeout, wait_exit(pid, watcher.clone())).await {
            Ok(waited) => {
                waited?;
                tracing::info!(target: "shard.process", pid, "process exited after SIGTERM");
                Ok(StopOutcome::Graceful)
            }
            Err(_) => {
                tracing::warn!(
                    target: "shard.process",
                    pid,
                    timeout_secs = self.stop_timeout.as_secs_f64(),
                    "process ignored SIGTERM, killing"
                );
                sys::ensure_exists(pid)?;
                sys::kill(pid)?;
                wait_exit(pid, watcher).await?;
                Ok(StopOutcome::ForceKilled)
            }
        }
    }
}

impl Default for ProcessController {
    fn default() -> Self {
        Self::new(DEFAULT_STOP_TIMEOUT)
    }
}

async fn wait_exit(pid: i32, watcher: Option<watch::Receiver<ExitState>>) -> Result<(), ProcessError> {
    match watcher {
        Some(mut rx) => rx
            .wait_for(|state| state.is_some())
            .await
            .map(|_| ())
            .map_err(|_| ProcessError::WaitFailed {
                pid,
                reason: "exit watcher dropped before the process exited".to_string(),
            }),
        None => loop {
            if !sys::alive(pid)? {
                return Ok(());
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        },
    }
}

#[cfg(unix)]
mod sys {
    use nix::errno::Errno;
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    use crate::error::ProcessError;

    fn target(pid: i32) -> Result<Pid, ProcessError> {
        // 0 and negatives address process groups
        if pid <= 0 {
            return Err(ProcessError::NotFound { pid });
        }
        Ok(Pid::from_raw(pid))
    }

    pub fn ensure_exists(pid: i32) -> Result<(), ProcessError> {
        match signal::kill(target(pid)?, None) {
            Err(Errno::ESRCH) => Err(ProcessError::NotFound { pid }),
            _ => Ok(()),
        }
    }

    pub fn alive(pid: i32) -> Result<bool, ProcessError> {
        match signal::kill(target(pid)?, None) {
            Ok(()) | Err(Errno::EPERM) => Ok(true),
            Err(Errno::ESRCH) => Ok(false),
            Err(e) => Err(ProcessError::WaitFailed {
                pid,
                reason: e.to_string(),
            }),
        }
    }

    pub fn terminate(pid: i32) -> Result<(), ProcessError> {
        match signal::kill(target(pid)?, Signal::SIGTERM) {
            Ok(()) => Ok(()),
            // exited between the existence check and the signal
            Err(Errno::ESRCH) => Err(ProcessError::NotFound { pid }),
            Err(e) => Err(ProcessError::SignalFailed {
                pid,
                reason: e.to_string(),
            }),
        }
    }

    pub fn kill(pid: i32) -> Result<(), ProcessError> {
        signal::kill(target(pid)?, Signal::SIGKILL).map_err(|e| ProcessError::ForceKillFailed {
            pid,
            reason: e.to_string(),
        })
    }
}

#[cfg(not(unix))]
mod sys {
    use crate::error::ProcessError;

    const UNSUPPORTED: &str = "signals are not supported on this platform";

    pub fn ensure_exists(_pid: i32) -> Result<(), ProcessError> {
        Ok(())
    }

    pub fn alive(pid: i32) -> Result<bool, ProcessError> {
        Err(ProcessError::WaitFailed {
            pid,
            reason: UNSUPPORTED.to_string(),
        })
    }

    pub fn terminate(pid: i32) -> Result<(), ProcessError> {
        Err(ProcessError::SignalFailed {
            pid,
            reason: UNSUPPORTED.to_string(),
        })
    }

    pub fn kill(pid: i32) -> Result<(), ProcessError> {
        Err(ProcessError::ForceKillFailed {
            pid,
            reason: UNSUPPORTED.to_string(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::process::Stdio;

    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::process::Command;

    use super::*;

    /// Spawns `sh -c script`, waits for its first stdout line, and reports its
    /// exit through the controller like the nextflow runner does.
    async fn spawn_tracked(controller: &ProcessController, script: &str) -> i32 {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(script)
            .stdout(Stdio::piped())
            .spawn()
            .unwrap();
        let pid = child.id().unwrap() as i32;
        let mut lines = BufReader::new(child.stdout.take().unwrap()).lines();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("ready"));

        let notifier = controller.track(pid);
        tokio::spawn(async move {
            let status = child.wait().await.unwrap();
            notifier.exited(status.code().unwrap_or(-1));
        });
        pid
    }

    #[tokio::test]
    async fn cooperative_process_stops_gracefully() {
        let controller = ProcessController::new(Duration::from_secs(5));
        let pid = spawn_tracked(&controller, "echo ready; exec sleep 30").await;

        let outcome = controller.graceful_stop(pid).await.unwrap();

        assert_eq!(outcome, StopOutcome::Graceful);
    }

    #[tokio::test]
    async fn stubborn_process_is_force_killed_once() {
        let controller = ProcessController::new(Duration::from_millis(300));
        let pid = spawn_tracked(
            &controller,
            "trap '' TERM; echo ready; while :; do sleep 0.1; done",
        )
        .await;

        let outcome = controller.graceful_stop(pid).await.unwrap();

        assert_eq!(outcome, StopOutcome::ForceKilled);
        let again = controller.graceful_stop(pid).await.unwrap_err();
        assert!(matches!(again, ProcessError::NotFound { .. }));
    }

    #[tokio::test]
    async fn unknown_pid_is_not_found() {
        let controller = ProcessController::default();
        let err = controller.graceful_stop(i32::MAX).await.unwrap_err();
        assert!(matches!(err, ProcessError::NotFound { pid } if pid == i32::MAX));
    }

    #[tokio::test]
    async fn terminating_an_exited_process_is_not_found() {
        let mut child = Command::new("true").spawn().unwrap();
        let pid = child.id().unwrap() as i32;
        child.wait().await.unwrap();

        assert!(matches!(sys::terminate(pid), Err(ProcessError::NotFound { pid: p }) if p == pid));
    }

    #[tokio::test]
    async fn non_positive_pid_is_not_found() {
        let controller = ProcessController::default();
        assert!(matches!(
            controller.graceful_stop(0).await,
            Err(ProcessError::NotFound { pid: 0 })
        ));
    }
}
