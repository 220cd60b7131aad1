use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::debug;

/// Sentinel asking for a value derived from version control.
pub const AUTO: &str = "auto";

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("because this directory is not a git repository, --version cannot default to git commit SHA. --version must be set for this command.")]
    NoCommitSha,
    #[error("because this directory is not a git repository, --branch cannot default to current git branch")]
    NoCurrentBranch,
    #[error("failed to run git")]
    Spawn(#[source] std::io::Error),
}

/// True when the value should be filled in from version control.
pub fn wants_default(value: &str) -> bool {
    value.is_empty() || value == AUTO
}

/// Git working tree used to derive default versions and branches.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Default for Git {
    fn default() -> Self {
        Self::at(".")
    }
}

impl Git {
    pub fn at(workdir: impl AsRef<Path>) -> Self {
        Self {
            workdir: workdir.as_ref().to_path_buf(),
        }
    }

    /// Short (10 character) SHA of HEAD.
    pub fn short_sha(&self) -> Result<String, VcsError> {
        self.query(&["rev-parse", "--short=10", "HEAD"])?
            .ok_or(VcsError::NoCommitSha)
    }

    pub fn current_branch(&self) -> Result<String, VcsError> {
        self.query(&["branch", "--show-current"])?
            .ok_or(VcsError::NoCurrentBranch)
    }

    /// Return `requested` unless it is empty or `auto`, in which case the short SHA.
    pub fn resolve_version(&self, requested: &str) -> Result<String, VcsError> {
        if wants_default(requested) {
            let sha = self.short_sha()?;
            debug!(version = %sha, "defaulted version to git SHA");
            Ok(sha)
        } else {
            Ok(requested.to_string())
        }
    }

    /// Return `requested` unless it is empty or `auto`, in which case the current branch.
    pub fn resolve_branch(&self, requested: &str) -> Result<String, VcsError> {
        if wants_default(requested) {
            let branch = self.current_branch()?;
            debug!(branch = %branch, "defaulted branch to current git branch");
            Ok(branch)
        } else {
            Ok(requested.to_string())
        }
    }

    /// Ok(None) when git ran but refused (not a repository, no commits).
    fn query(&self, args: &[&str]) -> Result<Option<String>, VcsError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .map_err(VcsError::Spawn)?;
        if !output.status.success() {
            debug!(
                ?args,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "git query failed"
            );
            return Ok(None);
        }
        let text = String::from_utf8_lossy(&output.stdout);
        Ok(Some(text.trim_end_matches(['\r', '\n']).to_string()))
    }
}
