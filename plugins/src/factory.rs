use std::sync::Arc;

use shard_core::config::{BackendKind, EnvSource};
use shard_core::context::AppContext;
use shard_core::jobs::JobService;
use shard_core::runner::{DryRunValidator, Runner, RunnerRegistry};

use crate::backend::{FloatRunner, NextflowRunner};

/// One backend instance per kind, shared by every executor name mapped to it.
pub fn build_registry(ctx: &AppContext, env: Arc<dyn EnvSource>) -> RunnerRegistry {
    let cfg = ctx.cfg();
    let mut nextflow: Option<Arc<dyn Runner>> = None;
    let mut float: Option<Arc<dyn Runner>> = None;
    let mut registry = RunnerRegistry::new();

    for (executor, kind) in &cfg.executors {
        let runner = match kind {
            BackendKind::Nextflow => nextflow
                .get_or_insert_with(|| {
                    Arc::new(NextflowRunner::new(
                        cfg.nextflow.bin_path.clone(),
                        ctx.relay().clone(),
                        ctx.controller(),
                        ctx.tracker().clone(),
                    ))
                })
                .clone(),
            BackendKind::Float => float
                .get_or_insert_with(|| {
                    Arc::new(FloatRunner::new(
                        cfg.float.clone(),
                        env.clone(),
                        ctx.relay().clone(),
                        ctx.tracker().clone(),
                    ))
                })
                .clone(),
        };
        tracing::debug!(executor = %executor, backend = %kind, "registered executor");
        registry.register(executor.clone(), runner);
    }
    registry
}

pub fn build_validator(ctx: &AppContext) -> Option<DryRunValidator> {
    let cfg = ctx.cfg();
    if !cfg.validation.enabled {
        return None;
    }
    Some(DryRunValidator::new(
        cfg.nextflow.bin_path.clone(),
        ctx.relay().clone(),
        cfg.validation.diagnostic_log.clone(),
    ))
}

pub fn build_job_service(ctx: &AppContext, env: Arc<dyn EnvSource>) -> JobService {
    JobService::new(build_registry(ctx, env), build_validator(ctx), ctx.relay().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shard_core::config::{AppConfig, MapEnv};

    #[test]
    fn default_executors_map_to_backends() {
        let ctx = AppContext::new(AppConfig::default());
        let registry = build_registry(&ctx, Arc::new(MapEnv::default()));

        let names: Vec<_> = registry.executors().collect();
        assert_eq!(names, vec!["awsbatch", "float", "google-batch"]);
        assert_eq!(registry.resolve("awsbatch").unwrap().name(), "nextflow");
        assert_eq!(registry.resolve("google-batch").unwrap().name(), "nextflow");
        assert_eq!(registry.resolve("float").unwrap().name(), "float");
        assert!(registry.resolve("slurm").is_err());
    }

    #[test]
    fn executors_of_one_kind_share_a_backend() {
        let ctx = AppContext::new(AppConfig::default());
        let registry = build_registry(&ctx, Arc::new(MapEnv::default()));
        let a = registry.resolve("awsbatch").unwrap();
        let b = registry.resolve("google-batch").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn validator_follows_config() {
        let mut cfg = AppConfig::default();
        assert!(build_validator(&AppContext::new(cfg.clone())).is_some());
        cfg.validation.enabled = false;
        assert!(build_validator(&AppContext::new(cfg)).is_none());
    }
}
