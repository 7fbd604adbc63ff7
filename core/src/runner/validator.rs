use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::error::RunnerError;
use crate::logstream::LogRelay;

use super::descriptor::{RunDescriptor, CONFIG_FLAG};
use super::exit::exit_code;
use super::workspace::RunWorkspace;

/// Appended to the run name so the rehearsal never collides with the real run.
pub const DRY_RUN_SUFFIX: &str = "-mock";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Runs driven by `-main-script` cannot be rehearsed.
    Skipped,
    Passed,
}

/// Rehearses a submission with `-preview` and a local executor before the
/// real run is committed.
pub struct DryRunValidator {
    bin_path: String,
    relay: LogRelay,
    diagnostic_log: PathBuf,
}

impl DryRunValidator {
    pub fn new(bin_path: impl Into<String>, relay: LogRelay, diagnostic_log: impl Into<PathBuf>) -> Self {
        Self {
            bin_path: bin_path.into(),
            relay,
            diagnostic_log: diagnostic_log.into(),
        }
    }

    pub async fn validate(
        &self,
        run_name: &str,
        run: &RunDescriptor,
        cancel: &CancellationToken,
    ) -> Result<ValidationOutcome, RunnerError> {
        if run.has_main_script() {
            tracing::info!(run_name = %run_name, "skipping dry run for -main-script pipeline");
            return Ok(ValidationOutcome::Skipped);
        }

        let run = run
            .with_run_name(&format!("{}{}", run_name, DRY_RUN_SUFFIX))
            .with_work_directory_default()
            .as_dry_run();

        let workspace = RunWorkspace::with_config("runner-", &run.config_override)?;
        let mut args = run.command_arguments();
        args.push(CONFIG_FLAG.to_string());
        args.push(workspace.config_path().display().to_string());

        tracing::info!(run_name = %run_name, bin = %self.bin_path, "Running nextflow mock");
        let mut cmd = Command::new(&self.bin_path);
        cmd.args(&args).stdin(Stdio::null()).kill_on_drop(true);

        let output = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::warn!(run_name = %run_name, "dry run cancelled");
                return Err(RunnerError::Cancelled);
            }
            out = cmd.output() => out.map_err(|source| RunnerError::Launch {
                program: self.bin_path.clone(),
                source,
            })?,
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            let code = exit_code(output.status);
            tracing::info!(run_name = %run_name, exit_code = code, output = %combined, "nextflow mock error");
            self.relay_line(run_name, &format!("dry run exited with status {}", code));
            self.relay_line(run_name, &combined);
            match tokio::fs::read_to_string(&self.diagnostic_log).await {
                Ok(log) => self.relay_line(run_name, &log),
                Err(err) => tracing::warn!(
                    run_name = %run_name,
                    path = %self.diagnostic_log.display(),
                    error = %err,
                    "Failed to read diagnostic log"
                ),
            }
            return Err(RunnerError::Validation { output: combined });
        }

        tracing::info!(run_name = %run_name, "nextflow mock succeeded");
        self.relay_line(run_name, &combined);
        Ok(ValidationOutcome::Passed)
    }

    fn relay_line(&self, run_name: &str, message: &str) {
        if let Err(err) = self.relay.publish(run_name, message) {
            tracing::error!(run_name = %run_name, error = %err, "Failed to publish log");
        }
    }
}
