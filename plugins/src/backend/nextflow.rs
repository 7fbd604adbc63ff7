//! Runs the engine as a local subprocess and relays its output line by line.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio_util::task::TaskTracker;

use shard_core::error::RunnerError;
use shard_core::logstream::LogRelay;
use shard_core::runner::descriptor::CONFIG_FLAG;
use shard_core::runner::exit::exit_code;
use shard_core::runner::{ProcessController, RunDescriptor, RunWorkspace, Runner, StopRequest};

const WORKSPACE_PREFIX: &str = "runner-";

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    fn as_str(self) -> &'static str {
        match self {
            Stream::Stdout => "stdout",
            Stream::Stderr => "stderr",
        }
    }
}

pub struct NextflowRunner {
    bin_path: String,
    relay: LogRelay,
    controller: Arc<ProcessController>,
    tracker: TaskTracker,
}

impl NextflowRunner {
    pub fn new(
        bin_path: impl Into<String>,
        relay: LogRelay,
        controller: Arc<ProcessController>,
        tracker: TaskTracker,
    ) -> Self {
        Self {
            bin_path: bin_path.into(),
            relay,
            controller,
            tracker,
        }
    }
}

#[async_trait]
impl Runner for NextflowRunner {
    fn name(&self) -> &str {
        "nextflow"
    }

    async fn execute(&self, run: RunDescriptor, run_name: &str) -> Result<String, RunnerError> {
        let workspace = RunWorkspace::with_config(WORKSPACE_PREFIX, &run.config_override)?;
        let mut args = run.command_arguments();
        args.push(CONFIG_FLAG.to_string());
        args.push(workspace.config_path().display().to_string());

        let mut child = Command::new(&self.bin_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| {
                tracing::error!(bin = %self.bin_path, error = %source, "Failed to start command");
                RunnerError::Launch {
                    program: self.bin_path.clone(),
                    source,
                }
            })?;

        let pid = child.id().and_then(|id| i32::try_from(id).ok()).ok_or_else(|| {
            RunnerError::Launch {
                program: self.bin_path.clone(),
                source: std::io::Error::other("process exited before its pid was read"),
            }
        })?;
        let notifier = self.controller.track(pid);
        tracing::info!(run_name = %run_name, pid, "nextflow started");

        let stdout = child.stdout.take().map(|out| {
            self.tracker
                .spawn(relay_lines(out, Stream::Stdout, self.relay.clone(), run_name.to_string()))
        });
        let stderr = child.stderr.take().map(|err| {
            self.tracker
                .spawn(relay_lines(err, Stream::Stderr, self.relay.clone(), run_name.to_string()))
        });

        let run_name = run_name.to_string();
        self.tracker.spawn(async move {
            match child.wait().await {
                Ok(status) => {
                    let code = exit_code(status);
                    if status.success() {
                        tracing::info!(run_name = %run_name, pid, "Command exited");
                    } else {
                        tracing::info!(run_name = %run_name, pid, exit_code = code, "Command exited with error");
                    }
                    notifier.exited(code);
                }
                Err(err) => {
                    tracing::error!(run_name = %run_name, pid, error = %err, "wait on nextflow failed");
                    notifier.exited(-1);
                }
            }
            for reader in [stdout, stderr].into_iter().flatten() {
                let _ = reader.await;
            }
            drop(workspace);
        });

        Ok(pid.to_string())
    }

    async fn stop(&self, req: &StopRequest) -> Result<(), RunnerError> {
        let pid = req
            .process_handle
            .trim()
            .parse::<i32>()
            .ok()
            .filter(|pid| *pid > 0)
            .ok_or_else(|| RunnerError::InvalidHandle(req.process_handle.clone()))?;

        match self.controller.graceful_stop(pid).await {
            Ok(outcome) => {
                tracing::info!(pid, outcome = ?outcome, "nextflow stopped");
                Ok(())
            }
            Err(err) => {
                tracing::error!(pid, error = %err, "stop process");
                Err(err.into())
            }
        }
    }

    fn bin_path(&self) -> &str {
        &self.bin_path
    }
}

/// Publishes every line of `reader` to the run's log. Invalid UTF-8 is
/// replaced rather than ending the stream.
async fn relay_lines<R>(reader: R, stream: Stream, relay: LogRelay, run_name: String)
where
    R: AsyncRead + Unpin,
{
    let mut segments = BufReader::new(reader).split(b'\n');
    loop {
        let segment = match segments.next_segment().await {
            Ok(Some(segment)) => segment,
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(run_name = %run_name, stream = stream.as_str(), error = %err, "read failed");
                break;
            }
        };
        let raw = String::from_utf8_lossy(&segment);
        let line = raw.strip_suffix('\r').unwrap_or(&raw);

        match stream {
            Stream::Stdout => tracing::info!(run_name = %run_name, stdout = %line, "Command output"),
            Stream::Stderr => tracing::warn!(run_name = %run_name, stderr = %line, "Command error output"),
        }
        if let Err(err) = relay.publish(&run_name, line) {
            tracing::error!(run_name = %run_name, stream = stream.as_str(), error = %err, "Failed to publish log");
        }
    }
}
