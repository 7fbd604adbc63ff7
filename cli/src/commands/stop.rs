use std::sync::Arc;

use shard_core::config::EnvSource;
use shard_core::context::AppContext;
use shard_core::runner::StopRequest;

use super::cli::StopArgs;
use crate::error::CliError;

pub async fn stop(ctx: &AppContext, env: Arc<dyn EnvSource>, args: StopArgs) -> Result<(), CliError> {
    let registry = shard_plugins::build_registry(ctx, env);
    let req = StopRequest {
        process_handle: args.process_key,
        backend_name: args.executor,
    };
    registry.stop(&req).await?;
    println!("stopped {} ({})", req.process_handle, req.backend_name);
    Ok(())
}
