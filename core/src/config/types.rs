use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub nextflow: NextflowConfig,

    #[serde(default)]
    pub float: FloatConfig,

    #[serde(default)]
    pub process: ProcessConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default = "default_executors")]
    pub executors: BTreeMap<String, BackendKind>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            nextflow: NextflowConfig::default(),
            float: FloatConfig::default(),
            process: ProcessConfig::default(),
            history: HistoryConfig::default(),
            validation: ValidationConfig::default(),
            executors: default_executors(),
        }
    }
}

/// Concrete backend an executor name resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Nextflow,
    Float,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Nextflow => write!(f, "nextflow"),
            BackendKind::Float => write!(f, "float"),
        }
    }
}

fn default_executors() -> BTreeMap<String, BackendKind> {
    BTreeMap::from([
        ("awsbatch".to_string(), BackendKind::Nextflow),
        ("google-batch".to_string(), BackendKind::Nextflow),
        ("float".to_string(), BackendKind::Float),
    ])
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextflowConfig {
    #[serde(default = "default_nextflow_bin")]
    pub bin_path: String,
}

fn default_nextflow_bin() -> String {
    "nextflow".to_string()
}

impl Default for NextflowConfig {
    fn default() -> Self {
        Self {
            bin_path: default_nextflow_bin(),
        }
    }
}

/// Settings for MemVerge float submissions. The submit defaults match the
/// JuiceFS-backed AWS layout the job scripts expect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloatConfig {
    #[serde(default = "default_float_bin")]
    pub bin_path: String,

    /// Engine binary as seen from inside the submitted job.
    #[serde(default = "default_nextflow_bin")]
    pub nextflow_bin_path: String,

    #[serde(default = "default_float_image")]
    pub image: String,

    #[serde(default = "default_float_cpu")]
    pub cpu: u32,

    #[serde(default = "default_float_memory_gb")]
    pub memory_gb: u32,

    #[serde(default = "default_float_job_name")]
    pub job_name: String,

    #[serde(default = "default_vm_policy")]
    pub vm_policy: String,

    #[serde(default = "default_migrate_policy")]
    pub migrate_policy: String,

    #[serde(default = "default_cache_volume")]
    pub cache_volume: String,

    #[serde(default = "default_dir_map")]
    pub dir_map: String,

    #[serde(default = "default_bucket_env")]
    pub bucket_env: String,
}

fn default_float_bin() -> String {
    "float".to_string()
}

fn default_float_image() -> String {
    "docker.io/memverge/juiceflow".to_string()
}

fn default_float_cpu() -> u32 {
    8
}

fn default_float_memory_gb() -> u32 {
    16
}

fn default_float_job_name() -> String {
    "shard-run".to_string()
}

fn default_vm_policy() -> String {
    "[onDemand=true]".to_string()
}

fn default_migrate_policy() -> String {
    "[disable=true]".to_string()
}

fn default_cache_volume() -> String {
    "[size=120]:/mnt/jfs_cache".to_string()
}

fn default_dir_map() -> String {
    "/mnt/jfs:/mnt/jfs".to_string()
}

fn default_bucket_env() -> String {
    "BUCKET=https://cfdx-juicefs.s3.us-east-1.amazonaws.com".to_string()
}

impl Default for FloatConfig {
    fn default() -> Self {
        Self {
            bin_path: default_float_bin(),
            nextflow_bin_path: default_nextflow_bin(),
            image: default_float_image(),
            cpu: default_float_cpu(),
            memory_gb: default_float_memory_gb(),
            job_name: default_float_job_name(),
            vm_policy: default_vm_policy(),
            migrate_policy: default_migrate_policy(),
            cache_volume: default_cache_volume(),
            dir_map: default_dir_map(),
            bucket_env: default_bucket_env(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessConfig {
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,
}

fn default_stop_timeout_secs() -> u64 {
    15
}

impl ProcessConfig {
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            stop_timeout_secs: default_stop_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Oldest records are dropped once a run exceeds this many. Unbounded when unset.
    #[serde(default)]
    pub max_records_per_run: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_validation_enabled")]
    pub enabled: bool,

    #[serde(default = "default_diagnostic_log")]
    pub diagnostic_log: String,
}

fn default_validation_enabled() -> bool {
    true
}

fn default_diagnostic_log() -> String {
    ".nextflow.log".to_string()
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: default_validation_enabled(),
            diagnostic_log: default_diagnostic_log(),
        }
    }
}
