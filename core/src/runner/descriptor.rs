use serde::{Deserialize, Serialize};

pub const NAME_FLAG: &str = "-name";
pub const WORK_DIR_FLAG: &str = "-work-dir";
pub const BUCKET_DIR_FLAG: &str = "-bucket-dir";
pub const MAIN_SCRIPT_FLAG: &str = "-main-script";
pub const PREVIEW_FLAG: &str = "-preview";
pub const CONFIG_FLAG: &str = "-c";
pub const DEFAULT_WORK_DIR: &str = "/tmp";

/// Config used for rehearsals: no Tower telemetry, everything runs locally.
pub const DRY_RUN_CONFIG: &str = r#"
tower { enabled = false }
process { executor = "local" }
"#;

/// One user-supplied pipeline parameter. Flags contribute only their key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub is_flag: bool,
}

impl Parameter {
    pub fn to_args(&self) -> Vec<String> {
        if self.is_flag {
            vec![self.key.clone()]
        } else {
            vec![self.key.clone(), self.value.clone()]
        }
    }
}

/// A pipeline invocation. Every transformation returns a new descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunDescriptor {
    pub pipeline_url: String,
    pub config_override: String,
    pub args: Vec<String>,
}

impl RunDescriptor {
    pub fn new(pipeline_url: impl Into<String>, config_override: impl Into<String>) -> Self {
        Self {
            pipeline_url: pipeline_url.into(),
            config_override: config_override.into(),
            args: Vec::new(),
        }
    }

    pub fn with_parameters(mut self, params: &[Parameter]) -> Self {
        self.args.extend(params.iter().flat_map(Parameter::to_args));
        self
    }

    /// `run <pipeline> <args...>`, the engine's argument vector.
    pub fn command_arguments(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.args.len() + 2);
        out.push("run".to_string());
        out.push(self.pipeline_url.clone());
        out.extend(self.args.iter().cloned());
        out
    }

    pub fn as_dry_run(&self) -> Self {
        let mut run = self.clone();
        run.config_override = DRY_RUN_CONFIG.to_string();
        run.args.push(PREVIEW_FLAG.to_string());
        run
    }

    pub fn without_work_directory(&self) -> Self {
        let mut run = self.clone();
        run.args = strip_pairs(&self.args, &[WORK_DIR_FLAG, BUCKET_DIR_FLAG]);
        run
    }

    pub fn with_work_directory_default(&self) -> Self {
        let mut run = self.clone();
        if !self.has_work_directory() {
            run.args.push(WORK_DIR_FLAG.to_string());
            run.args.push(DEFAULT_WORK_DIR.to_string());
        }
        run
    }

    pub fn with_run_name(&self, name: &str) -> Self {
        let mut run = self.clone();
        run.args = strip_pairs(&self.args, &[NAME_FLAG]);
        run.args.push(NAME_FLAG.to_string());
        run.args.push(name.to_string());
        run
    }

    pub fn has_work_directory(&self) -> bool {
        self.args
            .iter()
            .any(|a| a == WORK_DIR_FLAG || a == BUCKET_DIR_FLAG)
    }

    pub fn has_main_script(&self) -> bool {
        self.args.iter().any(|a| a == MAIN_SCRIPT_FLAG)
    }
}

/// Drops every occurrence of the given flags together with the value that follows.
fn strip_pairs(args: &[String], flags: &[&str]) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len());
    let mut it = args.iter();
    while let Some(arg) = it.next() {
        if flags.contains(&arg.as_str()) {
            it.next();
            continue;
        }
        out.push(arg.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn run_with(a: &[&str]) -> RunDescriptor {
        RunDescriptor {
            pipeline_url: "https://example.org/pipe".to_string(),
            config_override: "process.executor = 'awsbatch'".to_string(),
            args: args(a),
        }
    }

    #[test]
    fn command_arguments_prepend_run_and_pipeline() {
        let run = run_with(&["--input", "s3://in", "-resume"]);
        assert_eq!(
            run.command_arguments(),
            args(&["run", "https://example.org/pipe", "--input", "s3://in", "-resume"])
        );
    }

    #[test]
    fn parameters_expand_in_order() {
        let params = vec![
            Parameter { key: "--outdir".into(), value: "s3://out".into(), is_flag: false },
            Parameter { key: "-resume".into(), value: "ignored".into(), is_flag: true },
        ];
        let run = RunDescriptor::new("p", "").with_parameters(&params);
        assert_eq!(run.args, args(&["--outdir", "s3://out", "-resume"]));
    }

    #[test]
    fn run_name_is_replaced_not_duplicated() {
        let run = run_with(&["-name", "old", "--x", "1"])
            .with_run_name("first")
            .with_run_name("second");
        assert_eq!(run.args, args(&["--x", "1", "-name", "second"]));
    }

    #[test]
    fn run_name_is_idempotent() {
        let once = run_with(&[]).with_run_name("n");
        let twice = once.with_run_name("n");
        assert_eq!(once, twice);
        assert_eq!(twice.args.iter().filter(|a| *a == NAME_FLAG).count(), 1);
    }

    #[test]
    fn without_work_directory_removes_flag_and_value() {
        let run = run_with(&["-work-dir", "s3://w", "--a", "b", "-bucket-dir", "s3://b"]);
        assert_eq!(run.without_work_directory().args, args(&["--a", "b"]));
    }

    #[test]
    fn strip_then_default_yields_single_default_pair() {
        let run = run_with(&["-work-dir", "s3://w", "-work-dir", "s3://w2"])
            .without_work_directory()
            .with_work_directory_default();
        assert_eq!(run.args, args(&["-work-dir", "/tmp"]));
    }

    #[test]
    fn default_work_directory_keeps_existing_one() {
        let run = run_with(&["-bucket-dir", "gs://b"]).with_work_directory_default();
        assert_eq!(run.args, args(&["-bucket-dir", "gs://b"]));
    }

    #[test]
    fn dry_run_swaps_config_and_adds_preview() {
        let original = run_with(&["--a", "b"]);
        let dry = original.as_dry_run();
        assert!(dry.config_override.contains("tower { enabled = false }"));
        assert!(dry.config_override.contains(r#"executor = "local""#));
        assert_eq!(dry.args.last().map(String::as_str), Some(PREVIEW_FLAG));
        // receiver untouched
        assert_eq!(original.args, args(&["--a", "b"]));
        assert!(original.config_override.contains("awsbatch"));
    }

    #[test]
    fn trailing_flag_without_value_is_dropped() {
        let run = run_with(&["--a", "-name"]).with_run_name("x");
        assert_eq!(run.args, args(&["--a", "-name", "x"]));
    }

    #[test]
    fn main_script_detection() {
        assert!(run_with(&["-main-script", "main.nf"]).has_main_script());
        assert!(!run_with(&["--main", "x"]).has_main_script());
    }
}
