use std::io::Write;

use tokio_util::sync::CancellationToken;

use shard_core::context::AppContext;
use shard_core::runner::{DryRunValidator, ValidationOutcome};

use super::cli::ValidateArgs;
use super::run::spawn_interrupt_watcher;
use super::{descriptor, print_record};
use crate::error::CliError;

/// Rehearses even when `[validation].enabled` is off.
pub async fn validate(ctx: &AppContext, args: ValidateArgs) -> Result<(), CliError> {
    let cfg = ctx.cfg();
    let validator = DryRunValidator::new(
        cfg.nextflow.bin_path.clone(),
        ctx.relay().clone(),
        cfg.validation.diagnostic_log.clone(),
    );
    let run_name = args.pipeline.run_name.clone();
    let run = descriptor(&args.pipeline)?;

    let cancel = CancellationToken::new();
    let interrupt = spawn_interrupt_watcher(cancel.clone());
    let result = validator.validate(&run_name, &run, &cancel).await;
    interrupt.abort();

    let mut out = std::io::stdout();
    for record in ctx.relay().history(&run_name) {
        print_record(&mut out, &record, false)?;
    }
    let verdict = match result? {
        ValidationOutcome::Skipped => "validation skipped (-main-script)",
        ValidationOutcome::Passed => "validation passed",
    };
    writeln!(out, "{verdict}").map_err(CliError::Output)
}
