//! Error types for recordscope-cache

use thiserror::Error;

/// Errors that can occur in the mining cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// Serialization error (bincode)
    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Manifest serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Manifest written by a newer, unknown cache format
    #[error("Unsupported cache version: {found} (expected at most {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CacheError {
    /// True when the underlying failure is the disk running out of space
    pub fn is_storage_full(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::StorageFull)
    }
}

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
