use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

mod commands;
mod error;
mod logging;

use commands::cli;
use error::CliError;
use shard_core::config::{load_default, load_from_path, EnvSource, ProcessEnv};
use shard_core::context::AppContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();

    let cfg = match &args.config {
        Some(path) => load_from_path(path, &ProcessEnv),
        None => load_default(&ProcessEnv),
    }
    .context("loading configuration")?;
    logging::init_logging(args.log_level, &cfg.logging.level);

    let ctx = AppContext::new(cfg);
    let env: Arc<dyn EnvSource> = Arc::new(ProcessEnv);
    let result = dispatch(&ctx, env, args.command).await;

    ctx.shutdown().await;
    result.map_err(anyhow::Error::from)
}

async fn dispatch(ctx: &AppContext, env: Arc<dyn EnvSource>, cmd: cli::Commands) -> Result<(), CliError> {
    match cmd {
        cli::Commands::Run(run_args) => commands::run::run(ctx, env, run_args).await,
        cli::Commands::Validate(validate_args) => commands::validate::validate(ctx, validate_args).await,
        cli::Commands::Stop(stop_args) => commands::stop::stop(ctx, env, stop_args).await,
    }
}
