//! Error types for git mining operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while talking to git.
#[derive(Error, Debug)]
pub enum GitMiningError {
    #[error("Git is not available on this system")]
    GitNotAvailable,

    #[error("Path is not a git repository: {0}")]
    NotARepository(PathBuf),

    #[error("Git command failed: {0}")]
    CommandFailed(String),

    /// A commit record did not have the expected shape.
    #[error("Unparsable history at {revision}: {reason}")]
    UnparsableHistory { revision: String, reason: String },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("UTF-8 decoding error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),
}

impl GitMiningError {
    pub(crate) fn unparsable(revision: &str, reason: impl Into<String>) -> Self {
        GitMiningError::UnparsableHistory {
            revision: revision.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GitMiningError>;
