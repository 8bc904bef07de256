//! Git command execution wrapper.

use super::error::{GitMiningError, Result};
use super::parser::{self, Commit, CommitId};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Result of a single checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutAttempt {
    Switched,
    /// Git refused; carries its diagnostic output.
    Rejected(String),
}

/// Version-control operations the miner needs from a working tree.
pub trait VersionControl {
    /// Root of the working tree.
    fn work_tree(&self) -> &Path;

    /// Header of the commit `revision` names, or `None` past the root.
    fn commit_record(&self, revision: &str) -> Result<Option<Commit>>;

    /// Switch the working tree to `id`. Checking out the current commit
    /// succeeds.
    fn checkout(&self, id: &CommitId) -> Result<CheckoutAttempt>;

    /// Paths changed between `HEAD` and its first parent, relative to the
    /// working tree. For a root commit, every path it introduces.
    fn changed_files(&self) -> Result<Vec<String>>;

    fn head(&self) -> Result<CommitId>;

    /// Branch name, or the commit id when `HEAD` is detached.
    fn original_position(&self) -> Result<String>;

    /// Return to a position from [`VersionControl::original_position`].
    fn restore(&self, position: &str) -> Result<CheckoutAttempt>;
}

/// Wrapper for executing git commands.
#[derive(Debug, Clone)]
pub struct GitExecutor {
    repo_path: PathBuf,
}

impl GitExecutor {
    /// Create a new git executor for the given repository path.
    pub fn new(repo_path: &Path) -> Result<Self> {
        // Verify git is available
        let output = Command::new("git").arg("--version").output();
        match output {
            Ok(output) if output.status.success() => {}
            _ => return Err(GitMiningError::GitNotAvailable),
        }

        // Verify path is the top of a working tree
        let output = Command::new("git")
            .current_dir(repo_path)
            .args(["rev-parse", "--show-toplevel"])
            .output()?;

        if !output.status.success() {
            return Err(GitMiningError::NotARepository(repo_path.to_path_buf()));
        }

        Ok(Self {
            repo_path: repo_path.to_path_buf(),
        })
    }

    /// Whether `path` looks like a working tree root, without spawning git.
    pub fn is_work_tree(path: &Path) -> bool {
        path.join(".git").exists()
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        Ok(Command::new("git")
            .current_dir(&self.repo_path)
            .args(args)
            .output()?)
    }

    /// Run git and return stdout, failing on a non-zero exit.
    fn run_checked(&self, args: &[&str]) -> Result<String> {
        let output = self.run(args)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitMiningError::CommandFailed(format!(
                "git {}: {}",
                args.join(" "),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8(output.stdout)?)
    }

    fn switch_to(&self, target: &str) -> Result<CheckoutAttempt> {
        let output = self.run(&["checkout", "--quiet", target])?;

        if output.status.success() {
            Ok(CheckoutAttempt::Switched)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Ok(CheckoutAttempt::Rejected(stderr.trim().to_string()))
        }
    }

    fn has_parent(&self) -> Result<bool> {
        let output = self.run(&["rev-parse", "--verify", "--quiet", "HEAD^"])?;
        Ok(output.status.success())
    }
}

impl VersionControl for GitExecutor {
    fn work_tree(&self) -> &Path {
        &self.repo_path
    }

    fn commit_record(&self, revision: &str) -> Result<Option<Commit>> {
        let probe = format!("{revision}^{{commit}}");
        let exists = self.run(&["rev-parse", "--verify", "--quiet", &probe])?;
        if !exists.status.success() {
            return Ok(None);
        }

        let mut args: Vec<&str> = parser::RECORD_FORMAT.to_vec();
        args.push(revision);
        args.push("--");
        let record = self.run_checked(&args)?;

        parser::parse_commit_record(revision, &record).map(Some)
    }

    fn checkout(&self, id: &CommitId) -> Result<CheckoutAttempt> {
        self.switch_to(id.as_str())
    }

    fn changed_files(&self) -> Result<Vec<String>> {
        let stdout = if self.has_parent()? {
            self.run_checked(&["diff", "--name-only", "--no-renames", "-z", "HEAD^", "HEAD"])?
        } else {
            self.run_checked(&["show", "--name-only", "--no-renames", "-z", "--format=", "HEAD"])?
        };

        Ok(stdout
            .split('\0')
            .map(|p| p.trim_matches('\n'))
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect())
    }

    fn head(&self) -> Result<CommitId> {
        let stdout = self.run_checked(&["rev-parse", "HEAD"])?;
        CommitId::parse(&stdout).ok_or_else(|| GitMiningError::unparsable("HEAD", stdout.trim()))
    }

    fn original_position(&self) -> Result<String> {
        let output = self.run(&["symbolic-ref", "--quiet", "--short", "HEAD"])?;
        if output.status.success() {
            let branch = String::from_utf8(output.stdout)?;
            return Ok(branch.trim().to_string());
        }
        Ok(self.head()?.to_string())
    }

    fn restore(&self, position: &str) -> Result<CheckoutAttempt> {
        self.switch_to(position)
    }
}
