use std::path::Path;

use crate::error::ConfigError;

use super::env::EnvSource;
use super::types::AppConfig;

const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Loads `config.toml` from the working directory when present, defaults otherwise.
pub fn load_default(env: &dyn EnvSource) -> Result<AppConfig, ConfigError> {
    let mut cfg = if Path::new(DEFAULT_CONFIG_FILE).exists() {
        read_file(Path::new(DEFAULT_CONFIG_FILE))?
    } else {
        AppConfig::default()
    };
    apply_env_overrides(&mut cfg, env)?;
    Ok(cfg)
}

pub fn load_from_path(path: &Path, env: &dyn EnvSource) -> Result<AppConfig, ConfigError> {
    let mut cfg = read_file(path)?;
    apply_env_overrides(&mut cfg, env)?;
    Ok(cfg)
}

fn read_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let cfg: AppConfig = toml::from_str(&s).map_err(ConfigError::Parse)?;
    validate(&cfg)?;
    Ok(cfg)
}

fn validate(cfg: &AppConfig) -> Result<(), ConfigError> {
    if cfg.executors.is_empty() {
        return Err(ConfigError::Validation(
            "at least one executor must be configured".to_string(),
        ));
    }
    if cfg.nextflow.bin_path.trim().is_empty() {
        return Err(ConfigError::Validation("nextflow.bin_path is empty".to_string()));
    }
    if cfg.float.bin_path.trim().is_empty() {
        return Err(ConfigError::Validation("float.bin_path is empty".to_string()));
    }
    Ok(())
}

pub fn apply_env_overrides(cfg: &mut AppConfig, env: &dyn EnvSource) -> Result<(), ConfigError> {
    if let Some(v) = env.non_empty("SHARD_NEXTFLOW_BIN") {
        cfg.nextflow.bin_path = v;
    }
    if let Some(v) = env.non_empty("SHARD_FLOAT_BIN") {
        cfg.float.bin_path = v;
    }
    if let Some(v) = env.non_empty("SHARD_LOG_LEVEL") {
        cfg.logging.level = v;
    }
    if let Some(v) = env.non_empty("SHARD_STOP_TIMEOUT_SECS") {
        cfg.process.stop_timeout_secs =
            v.trim().parse().map_err(|_| ConfigError::EnvInvalid {
                key: "SHARD_STOP_TIMEOUT_SECS".to_string(),
                value: v.clone(),
            })?;
    }
    Ok(())
}
