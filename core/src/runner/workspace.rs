use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::RunnerError;

pub const INJECTED_CONFIG_FILE: &str = "injected.config";

/// Per-invocation scratch directory holding the injected config override.
/// The directory is removed when the workspace is dropped.
#[derive(Debug)]
pub struct RunWorkspace {
    dir: TempDir,
    config_path: PathBuf,
}

impl RunWorkspace {
    pub fn with_config(prefix: &str, config_override: &str) -> Result<Self, RunnerError> {
        let ws = Self::empty(prefix)?;
        std::fs::write(&ws.config_path, config_override).map_err(RunnerError::Workspace)?;
        Ok(ws)
    }

    pub fn empty(prefix: &str) -> Result<Self, RunnerError> {
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .map_err(RunnerError::Workspace)?;
        let config_path = dir.path().join(INJECTED_CONFIG_FILE);
        Ok(Self { dir, config_path })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn write(&self, file_name: &str, contents: &str) -> Result<PathBuf, RunnerError> {
        let path = self.dir.path().join(file_name);
        std::fs::write(&path, contents).map_err(RunnerError::Workspace)?;
        Ok(path)
    }
}
