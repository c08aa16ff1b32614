//! Executable probing on the invoking environment's search path.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolProbe {
    search_path: Option<OsString>,
}

impl ToolProbe {
    /// `None` means the process `PATH`.
    pub fn new(search_path: Option<OsString>) -> Self {
        Self { search_path }
    }

    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let found = match &self.search_path {
            Some(paths) => {
                let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
                which::which_in(name, Some(paths), cwd)
            }
            None => which::which(name),
        };
        found.ok()
    }
}

/// Captured result of one external process run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    /// stdout, a newline, then stderr.
    pub combined: String,
}

pub fn run_captured<S: AsRef<OsStr>>(
    program: &Path,
    args: &[S],
    cwd: &Path,
) -> std::io::Result<ProcessOutput> {
    let output = Command::new(program).args(args).current_dir(cwd).output()?;
    Ok(ProcessOutput {
        success: output.status.success(),
        exit_code: output.status.code(),
        combined: format!(
            "{}\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        ),
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    fn fake_tool(dir: &Path, name: &str, script: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", script)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn resolves_only_within_override_path() {
        let tmp = tempdir().unwrap();
        let tool = fake_tool(tmp.path(), "noxis-fake-tool", "exit 0");
        let probe = ToolProbe::new(Some(tmp.path().as_os_str().to_owned()));
        assert_eq!(probe.resolve("noxis-fake-tool"), Some(tool));
        assert_eq!(probe.resolve("definitely-not-installed-xyz"), None);
    }

    #[test]
    fn captured_output_combines_streams() {
        let tmp = tempdir().unwrap();
        let tool = fake_tool(tmp.path(), "noisy", "echo out; echo err 1>&2; exit 3");
        let out = run_captured(&tool, &["-q"], tmp.path()).unwrap();
        assert!(!out.success);
        assert_eq!(out.exit_code, Some(3));
        assert!(out.combined.contains("out"));
        assert!(out.combined.contains("err"));
    }
}
