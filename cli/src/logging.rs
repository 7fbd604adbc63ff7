//! Priority for the log filter:
//! 1. `RUST_LOG`
//! 2. `--log-level`
//! 3. `[logging].level` from config

use tracing_subscriber::EnvFilter;

use crate::commands::cli::LogLevel;

/// Logs go to stderr; stdout carries run output.
pub fn init_logging(cli_level: Option<LogLevel>, cfg_level: &str) {
    let fallback = cli_level.map(LogLevel::as_str).unwrap_or(cfg_level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
