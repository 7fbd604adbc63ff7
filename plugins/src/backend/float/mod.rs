//! MemVerge float backend: renders the job script bundle, logs in and
//! submits in the background. Float owns the job afterwards, so there is no
//! handle and nothing to stop.

mod mounts;
mod template;

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::task::TaskTracker;

use shard_core::config::{EnvSource, FloatConfig};
use shard_core::error::RunnerError;
use shard_core::logstream::LogRelay;
use shard_core::runner::{RunDescriptor, RunWorkspace, Runner, StopRequest};

pub use mounts::{extract_mount_paths, mount_args};
pub use template::{
    render_bundle, render_job_script, shell_quote, HOST_INIT_SCRIPT, HOST_TERMINATE_SCRIPT,
    JOB_SUBMIT_SCRIPT, REMOTE_CONFIG_FILE,
};

pub const FLOAT_ADDRESS: &str = "FLOAT_ADDRESS";
pub const FLOAT_USER: &str = "FLOAT_USER";
pub const FLOAT_PASS: &str = "FLOAT_PASS";
pub const FLOAT_AWS_SG: &str = "FLOAT_AWS_SG";
pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";

const WORKSPACE_PREFIX: &str = "float-runner-";

/// Fleet credentials and placement, all read before anything is written.
#[derive(Clone)]
pub struct FloatCredentials {
    pub address: String,
    pub user: String,
    pub password: String,
    pub security_group: String,
    pub github_token: Option<String>,
}

impl std::fmt::Debug for FloatCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FloatCredentials")
            .field("address", &self.address)
            .field("user", &self.user)
            .field("password", &"***")
            .field("security_group", &self.security_group)
            .field("github_token", &self.github_token.as_ref().map(|_| "***"))
            .finish()
    }
}

impl FloatCredentials {
    pub fn from_env(env: &dyn EnvSource) -> Result<Self, RunnerError> {
        let required = |key: &str| {
            env.non_empty(key).ok_or_else(|| RunnerError::ConfigurationMissing {
                key: key.to_string(),
            })
        };
        Ok(Self {
            address: required(FLOAT_ADDRESS)?,
            user: required(FLOAT_USER)?,
            password: required(FLOAT_PASS)?,
            security_group: required(FLOAT_AWS_SG)?,
            github_token: env.non_empty(GITHUB_TOKEN),
        })
    }

    pub fn login_args(&self) -> Vec<String> {
        [
            "login",
            "-a",
            self.address.as_str(),
            "-u",
            self.user.as_str(),
            "-p",
            self.password.as_str(),
        ]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }
}

/// Engine command line as run inside the float job.
pub fn remote_command(cfg: &FloatConfig, run: &RunDescriptor) -> Vec<String> {
    let mut command = vec![
        cfg.nextflow_bin_path.clone(),
        "run".to_string(),
        run.pipeline_url.clone(),
        "-c".to_string(),
        REMOTE_CONFIG_FILE.to_string(),
    ];
    command.extend(run.args.iter().cloned());
    command
}

/// `float submit` arguments for a bundle written to `workspace`, followed by
/// the override's mount directives.
pub fn submit_args(cfg: &FloatConfig, workspace: &Path, security_group: &str, config_override: &str) -> Vec<String> {
    let script = |name: &str| workspace.join(name).display().to_string();
    let mut args = vec![
        "submit".to_string(),
        "--hostInit".to_string(),
        script(HOST_INIT_SCRIPT),
        "-i".to_string(),
        cfg.image.clone(),
        "--vmPolicy".to_string(),
        cfg.vm_policy.clone(),
        "--migratePolicy".to_string(),
        cfg.migrate_policy.clone(),
        "--dataVolume".to_string(),
        cfg.cache_volume.clone(),
        "--dirMap".to_string(),
        cfg.dir_map.clone(),
        "-c".to_string(),
        cfg.cpu.to_string(),
        "-m".to_string(),
        cfg.memory_gb.to_string(),
        "-n".to_string(),
        cfg.job_name.clone(),
        "--securityGroup".to_string(),
        security_group.to_string(),
        "--env".to_string(),
        cfg.bucket_env.clone(),
        "--hostTerminate".to_string(),
        script(HOST_TERMINATE_SCRIPT),
        "-j".to_string(),
        script(JOB_SUBMIT_SCRIPT),
    ];
    args.extend(mount_args(config_override));
    args
}

pub struct FloatRunner {
    cfg: FloatConfig,
    env: Arc<dyn EnvSource>,
    relay: LogRelay,
    tracker: TaskTracker,
}

impl FloatRunner {
    pub fn new(cfg: FloatConfig, env: Arc<dyn EnvSource>, relay: LogRelay, tracker: TaskTracker) -> Self {
        Self {
            cfg,
            env,
            relay,
            tracker,
        }
    }
}

#[async_trait]
impl Runner for FloatRunner {
    fn name(&self) -> &str {
        "float"
    }

    async fn execute(&self, run: RunDescriptor, run_name: &str) -> Result<String, RunnerError> {
        let creds = FloatCredentials::from_env(self.env.as_ref())?;

        // float manages storage itself
        let run = run.without_work_directory();
        let command = remote_command(&self.cfg, &run);
        tracing::debug!(target: "shard.float", run_name = %run_name, command = %command.join(" "), "remote command");

        tracing::info!(target: "shard.float", run_name = %run_name, action = "storing job files", "float execute");
        let bundle = render_bundle(&run.config_override, &command, creds.github_token.as_deref())?;
        let workspace = RunWorkspace::empty(WORKSPACE_PREFIX)?;
        for (name, contents) in &bundle {
            workspace.write(name, contents)?;
        }

        let args = submit_args(&self.cfg, workspace.path(), &creds.security_group, &run.config_override);
        let submission = Submission {
            bin_path: self.cfg.bin_path.clone(),
            login_args: creds.login_args(),
            submit_args: args,
            workspace,
            relay: self.relay.clone(),
            run_name: run_name.to_string(),
        };
        self.tracker.spawn(submission.run());

        Ok(String::new())
    }

    async fn stop(&self, req: &StopRequest) -> Result<(), RunnerError> {
        tracing::debug!(target: "shard.float", handle = %req.process_handle, "stop not supported by float; ignoring");
        Ok(())
    }

    fn bin_path(&self) -> &str {
        &self.cfg.bin_path
    }
}

struct Submission {
    bin_path: String,
    login_args: Vec<String>,
    submit_args: Vec<String>,
    workspace: RunWorkspace,
    relay: LogRelay,
    run_name: String,
}

impl Submission {
    async fn run(self) {
        tracing::info!(target: "shard.float", run_name = %self.run_name, action = "authenticating", "float execute");
        if let Err(reason) = self.login().await {
            tracing::error!(target: "shard.float", run_name = %self.run_name, error = %reason, "failed to authenticate");
            self.report(&format!("float login failed: {reason}"));
        }

        tracing::info!(target: "shard.float", run_name = %self.run_name, action = "submitting", "float execute");
        let output = Command::new(&self.bin_path)
            .args(&self.submit_args)
            .current_dir(self.workspace.path())
            .stdin(Stdio::null())
            .output()
            .await;

        match output {
            Ok(out) => {
                let mut combined = String::from_utf8_lossy(&out.stdout).into_owned();
                combined.push_str(&String::from_utf8_lossy(&out.stderr));
                tracing::debug!(target: "shard.float", run_name = %self.run_name, output = %combined, "float exec output");
                if !out.status.success() {
                    tracing::error!(target: "shard.float", run_name = %self.run_name, status = %out.status, "float submit failed");
                }
                self.report(&combined);
            }
            Err(err) => {
                tracing::error!(target: "shard.float", run_name = %self.run_name, error = %err, "float exec error");
                self.report(&format!("float submit failed: {err}"));
            }
        }
        // workspace dropped here, removing the bundle
    }

    async fn login(&self) -> Result<(), String> {
        let out = Command::new(&self.bin_path)
            .args(&self.login_args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|err| err.to_string())?;
        if out.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&out.stderr);
        Err(format!("{} {}", out.status, stderr.trim()))
    }

    fn report(&self, message: &str) {
        if let Err(err) = self.relay.publish(&self.run_name, message) {
            tracing::error!(target: "shard.float", run_name = %self.run_name, error = %err, "Failed to publish log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shard_core::config::MapEnv;

    fn full_env() -> MapEnv {
        MapEnv::default()
            .with(FLOAT_ADDRESS, "10.0.0.1")
            .with(FLOAT_USER, "admin")
            .with(FLOAT_PASS, "s3cret")
            .with(FLOAT_AWS_SG, "sg-123")
    }

    #[test]
    fn credentials_require_all_fleet_values() {
        for key in [FLOAT_ADDRESS, FLOAT_USER, FLOAT_PASS, FLOAT_AWS_SG] {
            let env = full_env().with(key, "  ");
            match FloatCredentials::from_env(&env) {
                Err(RunnerError::ConfigurationMissing { key: missing }) => assert_eq!(missing, key),
                other => panic!("expected {key} to be missing, got {other:?}"),
            }
        }
    }

    #[test]
    fn token_is_optional_and_redacted() {
        let creds = FloatCredentials::from_env(&full_env()).unwrap();
        assert_eq!(creds.github_token, None);

        let creds = FloatCredentials::from_env(&full_env().with(GITHUB_TOKEN, "ghp_abc")).unwrap();
        assert_eq!(creds.github_token.as_deref(), Some("ghp_abc"));
        let shown = format!("{creds:?}");
        assert!(!shown.contains("s3cret"));
        assert!(!shown.contains("ghp_abc"));
    }

    #[test]
    fn login_args_match_cli() {
        let creds = FloatCredentials::from_env(&full_env()).unwrap();
        assert_eq!(
            creds.login_args(),
            vec!["login", "-a", "10.0.0.1", "-u", "admin", "-p", "s3cret"]
        );
    }

    #[test]
    fn remote_command_points_at_mmc_config() {
        let run = RunDescriptor {
            pipeline_url: "https://github.com/nf-core/rnaseq".into(),
            config_override: String::new(),
            args: vec!["--outdir".into(), "s3://out".into()],
        };
        assert_eq!(
            remote_command(&FloatConfig::default(), &run),
            vec![
                "nextflow",
                "run",
                "https://github.com/nf-core/rnaseq",
                "-c",
                "mmc.config",
                "--outdir",
                "s3://out"
            ]
        );
    }

    #[test]
    fn submit_args_follow_defaults_then_mounts() {
        let ws = Path::new("/tmp/float-runner-x");
        let args = submit_args(
            &FloatConfig::default(),
            ws,
            "sg-123",
            "extra = '--dataVolume [mode=r]s3://data/:/data'",
        );
        assert_eq!(
            args,
            vec![
                "submit",
                "--hostInit",
                "/tmp/float-runner-x/transient_JFS_AWS.sh",
                "-i",
                "docker.io/memverge/juiceflow",
                "--vmPolicy",
                "[onDemand=true]",
                "--migratePolicy",
                "[disable=true]",
                "--dataVolume",
                "[size=120]:/mnt/jfs_cache",
                "--dirMap",
                "/mnt/jfs:/mnt/jfs",
                "-c",
                "8",
                "-m",
                "16",
                "-n",
                "shard-run",
                "--securityGroup",
                "sg-123",
                "--env",
                "BUCKET=https://cfdx-juicefs.s3.us-east-1.amazonaws.com",
                "--hostTerminate",
                "/tmp/float-runner-x/hostTerminate_AWS.sh",
                "-j",
                "/tmp/float-runner-x/job_submit_AWS.sh",
                "--dataVolume",
                "[mode=r]s3://data/:/data",
            ]
        );
    }
}
