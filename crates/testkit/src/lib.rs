//! Test helpers: throwaway executables standing in for `nextflow` and `float`.
//!
//! Every fake appends its argument list (one invocation per line) to
//! `calls.log` next to the script before running its body.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tempfile::TempDir;

pub struct FakeBin {
    dir: TempDir,
    path: PathBuf,
    calls: PathBuf,
}

impl FakeBin {
    /// Writes an executable `sh` script called `name` whose body is `body`.
    pub fn new(name: &str, body: &str) -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(name);
        let calls = dir.path().join("calls.log");
        let script = format!(
            "#!/bin/sh\nprintf '%s\\n' \"$*\" >> '{}'\n{}\n",
            calls.display(),
            body
        );
        std::fs::write(&path, script)?;
        make_executable(&path)?;
        Ok(Self { dir, path, calls })
    }

    pub fn path_str(&self) -> String {
        self.path.display().to_string()
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Argument lists of every invocation so far, oldest first.
    pub fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(&self.calls)
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

/// Engine fake: `-preview` runs print and succeed, real runs print a banner
/// on both streams and then sleep until signalled.
pub fn fake_nextflow() -> Result<FakeBin> {
    FakeBin::new(
        "nextflow",
        r#"case " $* " in
  *" -preview "*)
    echo "N E X T F L O W  ~  preview"
    exit 0
    ;;
esac
printf '\033[1;32mN E X T F L O W\033[0m started\n'
echo "executor >  local" >&2
exec sleep 30"#,
    )
}

/// Engine fake whose rehearsal fails with a config error.
pub fn failing_nextflow() -> Result<FakeBin> {
    FakeBin::new(
        "nextflow",
        r#"echo "ERROR ~ Unknown config attribute process.bogus" >&2
exit 1"#,
    )
}

/// Fleet CLI fake: logs in and accepts submissions.
pub fn fake_float() -> Result<FakeBin> {
    FakeBin::new(
        "float",
        r#"case "$1" in
  login) echo "Login succeeded" ;;
  submit) echo "id: job-123"; echo "status: Submitted" ;;
esac
exit 0"#,
    )
}

/// Fleet CLI fake that rejects credentials.
pub fn rejecting_float() -> Result<FakeBin> {
    FakeBin::new(
        "float",
        r#"if [ "$1" = "login" ]; then
  echo "Error: invalid username or password" >&2
  exit 1
fi
echo "id: job-123""#,
    )
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
