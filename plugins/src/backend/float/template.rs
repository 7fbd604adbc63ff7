//! Renders the float job script bundle.
//!
//! The submit script carries two whole-line markers. Each is replaced by a
//! block whose escaping is fixed: the config override goes through a quoted
//! heredoc (no expansion inside it), the engine command and token become
//! single-quoted shell words.

use shard_core::error::RunnerError;

pub const JOB_SUBMIT_SCRIPT: &str = "job_submit_AWS.sh";
pub const HOST_INIT_SCRIPT: &str = "transient_JFS_AWS.sh";
pub const HOST_TERMINATE_SCRIPT: &str = "hostTerminate_AWS.sh";

const JOB_SUBMIT_TEMPLATE: &str = include_str!("../../../templates/job_submit_AWS.sh");
const HOST_INIT: &str = include_str!("../../../templates/transient_JFS_AWS.sh");
const HOST_TERMINATE: &str = include_str!("../../../templates/hostTerminate_AWS.sh");

const CONFIG_OVERRIDE_MARKER: &str = "SHARD_CONFIG_OVERRIDE";
const NEXTFLOW_COMMAND_MARKER: &str = "SHARD_NEXTFLOW_COMMAND";

/// Config file the remote command is pointed at with `-c`.
pub const REMOTE_CONFIG_FILE: &str = "mmc.config";
pub const HEREDOC_TERMINATOR: &str = "SHARD_OVERRIDE_EOF";

/// `(file name, contents)` for every script float needs.
pub fn render_bundle(
    config_override: &str,
    command: &[String],
    github_token: Option<&str>,
) -> Result<Vec<(&'static str, String)>, RunnerError> {
    let job = render_job_script(JOB_SUBMIT_TEMPLATE, config_override, command, github_token)?;
    Ok(vec![
        (JOB_SUBMIT_SCRIPT, job),
        (HOST_INIT_SCRIPT, HOST_INIT.to_string()),
        (HOST_TERMINATE_SCRIPT, HOST_TERMINATE.to_string()),
    ])
}

pub fn render_job_script(
    template: &str,
    config_override: &str,
    command: &[String],
    github_token: Option<&str>,
) -> Result<String, RunnerError> {
    let override_block = override_block(config_override)?;
    let command_block = command_block(command, github_token);

    let mut seen_override = 0;
    let mut seen_command = 0;
    let mut out = String::with_capacity(template.len() + override_block.len() + command_block.len());
    for line in template.lines() {
        match line.trim() {
            CONFIG_OVERRIDE_MARKER => {
                seen_override += 1;
                out.push_str(&override_block);
            }
            NEXTFLOW_COMMAND_MARKER => {
                seen_command += 1;
                out.push_str(&command_block);
            }
            _ => out.push_str(line),
        }
        out.push('\n');
    }

    if seen_override != 1 || seen_command != 1 {
        return Err(RunnerError::Template(format!(
            "template must contain each marker exactly once (override: {seen_override}, command: {seen_command})"
        )));
    }
    Ok(out)
}

fn override_block(config_override: &str) -> Result<String, RunnerError> {
    if config_override
        .lines()
        .any(|line| line.trim() == HEREDOC_TERMINATOR)
    {
        return Err(RunnerError::Template(format!(
            "config override may not contain a line reading {HEREDOC_TERMINATOR}"
        )));
    }
    let body = config_override.trim_end_matches('\n');
    Ok(format!(
        "cat >> {REMOTE_CONFIG_FILE} <<'{HEREDOC_TERMINATOR}'\n{body}\n{HEREDOC_TERMINATOR}"
    ))
}

fn command_block(command: &[String], github_token: Option<&str>) -> String {
    let words: Vec<String> = command.iter().map(|w| shell_quote(w)).collect();
    let mut block = String::new();
    if let Some(token) = github_token {
        block.push_str(&format!("export GITHUB_TOKEN={}\n", shell_quote(token)));
    }
    block.push_str(&format!("nextflow_command=({})", words.join(" ")));
    block
}

/// Single-quotes `word` for bash. Embedded quotes become `'\''`.
pub fn shell_quote(word: &str) -> String {
    format!("'{}'", word.replace('\'', r"'\''"))
}
