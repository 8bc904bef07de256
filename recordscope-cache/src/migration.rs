//! Cache format versioning
//!
//! The cache directory carries a `manifest.json` naming the format version
//! and mapping repository keys to entry files. Older formats are discarded
//! rather than converted: every entry can be recomputed by re-mining.

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Manifest file name inside the cache directory
pub const MANIFEST_FILE: &str = "manifest.json";

/// Extension of per-repository entry files
pub const ENTRY_EXTENSION: &str = "bin";

pub const CURRENT_VERSION: u32 = 3;

/// Cache directory manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,

    /// Repository key -> entry file name
    #[serde(default)]
    pub entries: BTreeMap<String, String>,

    /// Next ordinal used to name an entry file
    #[serde(default)]
    pub next_ordinal: u64,
}

impl Manifest {
    pub fn new() -> Self {
        Self {
            version: CURRENT_VERSION,
            entries: BTreeMap::new(),
            next_ordinal: 0,
        }
    }

    /// Entry file name for `key`, allocating one if the key is new
    pub fn file_for(&mut self, key: &str) -> String {
        if let Some(name) = self.entries.get(key) {
            return name.clone();
        }
        let name = format!("{:08}.{}", self.next_ordinal, ENTRY_EXTENSION);
        self.next_ordinal += 1;
        self.entries.insert(key.to_string(), name.clone());
        name
    }

    /// Persist the manifest
    pub fn save(&self, dir: &Path) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        fs::write(dir.join(MANIFEST_FILE), bytes)?;
        Ok(())
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}

/// Load the manifest, resetting the directory if it holds an older format
pub fn load_or_reset(dir: &Path) -> Result<Manifest> {
    let manifest_path = dir.join(MANIFEST_FILE);
    if !manifest_path.exists() {
        log::debug!("No cache manifest at {}, starting empty", dir.display());
        let manifest = Manifest::new();
        manifest.save(dir)?;
        return Ok(manifest);
    }

    let manifest: Manifest = serde_json::from_slice(&fs::read(&manifest_path)?)?;

    log::info!(
        "Cache version: {} (current: {})",
        manifest.version,
        CURRENT_VERSION
    );

    if manifest.version > CURRENT_VERSION {
        return Err(CacheError::UnsupportedVersion {
            found: manifest.version,
            supported: CURRENT_VERSION,
        });
    }

    if manifest.version < CURRENT_VERSION {
        log::warn!(
            "Discarding cache written by format v{} (current v{})",
            manifest.version,
            CURRENT_VERSION
        );
        remove_entry_files(dir)?;
        let fresh = Manifest::new();
        fresh.save(dir)?;
        return Ok(fresh);
    }

    Ok(manifest)
}

fn remove_entry_files(dir: &Path) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some(ENTRY_EXTENSION) {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}
