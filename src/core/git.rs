#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::error::MgitError;

/// Thin wrapper around the git binary, bound to one working directory.
#[derive(Debug, Clone)]
pub struct Git {
    dir: PathBuf,
}

impl Git {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Runs git and returns trimmed stdout, failing on a non-zero exit.
    pub fn run(&self, args: &[&str]) -> Result<String, MgitError> {
        let out = self.run_raw(args)?;
        if out.status.success() {
            Ok(String::from_utf8_lossy(&out.stdout).trim().to_owned())
        } else {
            let stderr = String::from_utf8_lossy(&out.stderr);
            Err(MgitError::Other(format!(
                "git {}: {}",
                args.join(" "),
                stderr.trim()
            )))
        }
    }

    pub fn run_raw(&self, args: &[&str]) -> Result<Output, MgitError> {
        let out = Command::new("git")
            .args(args)
            .current_dir(&self.dir)
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => MgitError::GitNotFound,
                _ => MgitError::Other(format!("failed to run git: {e}")),
            })?;
        Ok(out)
    }
}

/// True when `path` looks like the root of a git repository or worktree.
#[must_use]
pub fn is_git_repo(path: &Path) -> bool {
    let candidate = path.join(".git");
    candidate.is_dir() || candidate.is_file()
}
