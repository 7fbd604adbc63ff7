use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Launch, rehearse and stop pipeline runs")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file; `./config.toml` is used when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Overrides `[logging].level`; `RUST_LOG` still wins.
    #[arg(long, value_enum, global = true)]
    pub log_level: Option<LogLevel>,
}

/// What to run. Shared by `run` and `validate`.
#[derive(ClapArgs, Debug, Clone)]
pub struct PipelineArgs {
    /// Unique name of this run; keys its log stream.
    #[arg(long)]
    pub run_name: String,

    /// Pipeline repository or path.
    #[arg(long)]
    pub pipeline: String,

    /// Engine config override, inline.
    #[arg(long, group = "override")]
    pub compute_override: Option<String>,

    /// Engine config override, read from a file.
    #[arg(long, group = "override")]
    pub compute_override_file: Option<PathBuf>,

    /// Pipeline parameter as KEY=VALUE. Can be specified multiple times.
    #[arg(long = "param", action = clap::ArgAction::Append, allow_hyphen_values = true)]
    pub params: Vec<String>,

    /// Value-less pipeline flag (e.g. `-resume`). Can be specified multiple times.
    #[arg(long = "flag", action = clap::ArgAction::Append, allow_hyphen_values = true)]
    pub flags: Vec<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Executor name, mapped to a backend by `[executors]`.
    #[arg(long, default_value = "awsbatch")]
    pub executor: String,

    /// Print log records as JSON lines.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct StopArgs {
    #[arg(long)]
    pub executor: String,

    /// Handle printed by `run`.
    #[arg(long)]
    pub process_key: String,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Rehearse, start and follow a pipeline run.
    Run(RunArgs),
    /// Rehearse only.
    Validate(ValidateArgs),
    /// Stop a run started by `run`.
    Stop(StopArgs),
}
