pub mod cli;
pub mod run;
pub mod stop;
pub mod validate;

use std::io::Write;

use shard_core::logstream::LogRecord;
use shard_core::runner::{Parameter, RunDescriptor};

use crate::error::CliError;
use cli::PipelineArgs;

/// `--param` values first, then `--flag` values, each in the order given.
pub fn parameters(args: &PipelineArgs) -> Result<Vec<Parameter>, CliError> {
    let mut out = Vec::with_capacity(args.params.len() + args.flags.len());
    for raw in &args.params {
        let (key, value) = raw
            .split_once('=')
            .filter(|(key, _)| !key.is_empty())
            .ok_or_else(|| CliError::InvalidParam(raw.clone()))?;
        out.push(Parameter {
            key: key.to_string(),
            value: value.to_string(),
            is_flag: false,
        });
    }
    out.extend(args.flags.iter().map(|flag| Parameter {
        key: flag.clone(),
        value: String::new(),
        is_flag: true,
    }));
    Ok(out)
}

pub fn compute_override(args: &PipelineArgs) -> Result<String, CliError> {
    match (&args.compute_override, &args.compute_override_file) {
        (Some(inline), _) => Ok(inline.clone()),
        (None, Some(path)) => std::fs::read_to_string(path).map_err(|source| CliError::ReadOverride {
            path: path.display().to_string(),
            source,
        }),
        (None, None) => Ok(String::new()),
    }
}

pub fn descriptor(args: &PipelineArgs) -> Result<RunDescriptor, CliError> {
    Ok(RunDescriptor::new(args.pipeline.clone(), compute_override(args)?)
        .with_parameters(&parameters(args)?)
        .with_run_name(&args.run_name))
}

pub fn print_record(out: &mut impl Write, record: &LogRecord, json: bool) -> Result<(), CliError> {
    let res = if json {
        match serde_json::to_string(record) {
            Ok(line) => writeln!(out, "{line}"),
            Err(err) => {
                tracing::warn!(error = %err, "skipping unserializable record");
                Ok(())
            }
        }
    } else {
        writeln!(out, "{}", record.message.trim_end_matches('\n'))
    };
    res.map_err(CliError::Output)
}
