use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use shard_core::config::{AppConfig, MapEnv};
use shard_core::context::AppContext;
use shard_core::jobs::{ExecutorSpec, RunRequest, TerminateRequest};
use shard_plugins::build_job_service;
use shard_testkit::fake_nextflow;
use tokio_util::sync::CancellationToken;

#[tokio::test(flavor = "multi_thread")]
async fn rehearse_start_stop_and_clean_up() {
    let nf = fake_nextflow().unwrap();
    let mut cfg = AppConfig::default();
    cfg.nextflow.bin_path = nf.path_str();
    cfg.process.stop_timeout_secs = 5;
    let ctx = AppContext::new(cfg);
    let service = build_job_service(&ctx, Arc::new(MapEnv::default()));

    let response = service
        .run(
            RunRequest {
                run_name: "e2e".to_string(),
                pipeline_url: "https://example.org/pipe".to_string(),
                executor: ExecutorSpec {
                    name: "awsbatch".to_string(),
                    compute_override: "process.cpus = 1".to_string(),
                },
                parameters: Vec::new(),
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert!(response.status);
    assert!(response.process_key.parse::<i32>().unwrap() > 0);

    let calls = nf.calls();
    assert_eq!(calls.len(), 2);
    assert!(
        calls[0].starts_with("run https://example.org/pipe -name e2e-mock -work-dir /tmp -preview -c "),
        "{}",
        calls[0]
    );
    assert!(calls[1].starts_with("run https://example.org/pipe -name e2e -c "), "{}", calls[1]);
    let config = calls[1].rsplit(' ').next().unwrap().to_string();
    assert!(config.ends_with("injected.config"));
    assert!(Path::new(&config).exists());

    let stopped = service
        .terminate(TerminateRequest {
            process_key: response.process_key.clone(),
            executor: response.executor.clone(),
        })
        .await
        .unwrap();
    assert!(stopped);

    tokio::time::timeout(Duration::from_secs(5), ctx.shutdown())
        .await
        .unwrap();
    assert!(!Path::new(&config).parent().unwrap().exists());
}
