//! Error types for the record miner.

use crate::config::ConfigError;
use crate::git_mining::GitMiningError;
use recordscope_cache::CacheError;
use std::io;
use thiserror::Error;

/// Errors that can occur while mining repositories.
#[derive(Debug, Error)]
pub enum MiningError {
    #[error("Git error: {0}")]
    Git(#[from] GitMiningError),

    #[error("Checkout of {commit} failed after {attempts} attempts: {diagnostic}")]
    CheckoutFailed {
        commit: String,
        attempts: u32,
        diagnostic: String,
    },

    #[error("Scratch buffer error: {0}")]
    Scratch(io::Error),

    #[error("Report error: {0}")]
    Report(#[from] csv::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("No space left on device: {0}")]
    StorageFull(io::Error),

    #[error("IO error: {0}")]
    Io(io::Error),
}

impl MiningError {
    /// Scratch I/O failure; running out of space is reported as such.
    pub fn scratch(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::StorageFull {
            MiningError::StorageFull(err)
        } else {
            MiningError::Scratch(err)
        }
    }

    /// Whether the whole batch must stop rather than just this repository.
    pub fn is_fatal(&self) -> bool {
        match self {
            MiningError::StorageFull(_) => true,
            MiningError::Cache(e) => e.is_storage_full(),
            MiningError::Io(e) | MiningError::Scratch(e) => is_storage_full(e),
            MiningError::Git(GitMiningError::IoError(e)) => is_storage_full(e),
            MiningError::Report(e) => match e.kind() {
                csv::ErrorKind::Io(e) => is_storage_full(e),
                _ => false,
            },
            _ => false,
        }
    }
}

fn is_storage_full(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::StorageFull
}

impl From<io::Error> for MiningError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::StorageFull {
            MiningError::StorageFull(err)
        } else {
            MiningError::Io(err)
        }
    }
}

/// Result type alias for mining operations.
pub type MiningResult<T> = Result<T, MiningError>;
