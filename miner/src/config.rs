//! Mining configuration, loaded from JSON and overridden from the command line.

use crate::git_mining::{cutoff, RetryPolicy};
use chrono::{DateTime, NaiveDate, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors reading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Settings of one mining run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Working trees, or directories whose immediate children are working
    /// trees.
    pub repos: Vec<PathBuf>,

    /// Commit traces stop at the first commit on or before this date.
    pub since: NaiveDate,

    pub max_checkout_attempts: u32,

    pub checkout_backoff_ms: u64,

    /// Holds newer file revisions during a commit step.
    pub scratch_dir: PathBuf,

    /// Receives `repositories.csv` and `commits.csv`.
    pub output_dir: PathBuf,

    /// Mining cache location; `None` disables caching.
    pub cache_dir: Option<PathBuf>,

    /// Globs a changed path must match to be analysed.
    pub include: Vec<String>,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            repos: Vec::new(),
            // First JDK release shipping records as a preview feature.
            since: NaiveDate::from_ymd_opt(2020, 3, 17).unwrap_or_default(),
            max_checkout_attempts: 3,
            checkout_backoff_ms: 250,
            scratch_dir: std::env::temp_dir().join("recordscope-scratch"),
            output_dir: PathBuf::from("recordscope-out"),
            cache_dir: None,
            include: vec!["**/*.java".to_string()],
        }
    }
}

impl MiningConfig {
    /// Read a JSON config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_checkout_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_checkout_attempts must be at least 1".into(),
            ));
        }
        if self.include.is_empty() {
            return Err(ConfigError::Invalid("include must not be empty".into()));
        }
        self.include_set().map(|_| ())
    }

    /// Compiled include globs.
    pub fn include_set(&self) -> Result<GlobSet, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.include {
            let glob = Glob::new(pattern)
                .map_err(|e| ConfigError::Invalid(format!("include glob {pattern:?}: {e}")))?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|e| ConfigError::Invalid(format!("include globs: {e}")))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.max_checkout_attempts,
            backoff: Duration::from_millis(self.checkout_backoff_ms),
        }
    }

    /// `since` as an instant: the start of that day in UTC.
    pub fn cutoff(&self) -> DateTime<Utc> {
        cutoff(self.since)
    }

    pub fn repositories_report(&self) -> PathBuf {
        self.output_dir.join("repositories.csv")
    }

    pub fn commits_report(&self) -> PathBuf {
        self.output_dir.join("commits.csv")
    }
}
