use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use shard_core::config::EnvSource;
use shard_core::context::AppContext;
use shard_core::jobs::{ExecutorSpec, RunRequest, TerminateRequest};

use super::cli::RunArgs;
use super::{compute_override, parameters, print_record};
use crate::error::CliError;

/// How long to keep draining the stream after the last background task ended.
const DRAIN_GRACE: Duration = Duration::from_millis(200);

pub async fn run(ctx: &AppContext, env: Arc<dyn EnvSource>, args: RunArgs) -> Result<(), CliError> {
    let service = shard_plugins::build_job_service(ctx, env);
    let req = RunRequest {
        run_name: args.pipeline.run_name.clone(),
        pipeline_url: args.pipeline.pipeline.clone(),
        executor: ExecutorSpec {
            name: args.executor.clone(),
            compute_override: compute_override(&args.pipeline)?,
        },
        parameters: parameters(&args.pipeline)?,
    };

    let cancel = CancellationToken::new();
    let interrupt = spawn_interrupt_watcher(cancel.clone());
    let started = service.run(req, &cancel).await;
    interrupt.abort();

    let response = match started {
        Ok(response) => response,
        Err(err) => {
            for record in service.relay().history(&args.pipeline.run_name) {
                print_record(&mut std::io::stdout(), &record, args.json)?;
            }
            return Err(err.into());
        }
    };

    match serde_json::to_string(&response) {
        Ok(line) => println!("{line}"),
        Err(err) => tracing::warn!(error = %err, "failed to encode response"),
    }
    let follow = CancellationToken::new();
    let Some(mut stream) = service.stream_logs(&response.run_name, follow.clone()) else {
        return Ok(());
    };

    // Nothing else is spawned from here on; the tracker empties when the run ends.
    ctx.tracker().close();
    let done = ctx.tracker().wait();
    tokio::pin!(done);

    let mut stopping = false;
    loop {
        tokio::select! {
            Some(record) = stream.recv() => print_record(&mut std::io::stdout(), &record, args.json)?,
            _ = &mut done => break,
            res = tokio::signal::ctrl_c(), if !stopping => {
                stopping = true;
                if let Err(err) = res {
                    tracing::warn!(error = %err, "failed to listen for interrupt");
                    continue;
                }
                tracing::info!(run_name = %response.run_name, "interrupt received, stopping run");
                let stop = TerminateRequest {
                    process_key: response.process_key.clone(),
                    executor: response.executor.clone(),
                };
                if let Err(err) = service.terminate(stop).await {
                    tracing::warn!(run_name = %response.run_name, error = %err, "stop failed");
                }
            }
        }
    }

    while let Ok(Some(record)) = tokio::time::timeout(DRAIN_GRACE, stream.recv()).await {
        print_record(&mut std::io::stdout(), &record, args.json)?;
    }
    follow.cancel();
    Ok(())
}

/// Cancels `cancel` on Ctrl-C. Abort the handle once it is no longer needed.
pub(crate) fn spawn_interrupt_watcher(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling");
            cancel.cancel();
        }
    })
}
