//! On-disk mining cache
//!
//! Entries are kept in memory in a `DashMap` and persisted as one bincode
//! file per repository. The manifest maps repository keys to file names.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::entry::CachedRepository;
use crate::error::Result;
use crate::migration::{self, Manifest};

/// Per-repository cache of mining results
pub struct MiningCache {
    dir: PathBuf,
    entries: DashMap<String, CachedRepository>,
    manifest: Mutex<Manifest>,
}

impl MiningCache {
    /// Open (or create) a cache rooted at `dir`
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let manifest = migration::load_or_reset(dir)?;

        let cache = Self {
            dir: dir.to_path_buf(),
            entries: DashMap::new(),
            manifest: Mutex::new(manifest),
        };
        cache.load_entries();

        log::info!("MiningCache opened at: {}", dir.display());
        Ok(cache)
    }

    /// Load existing entries, skipping unreadable files
    fn load_entries(&self) {
        let manifest = self.manifest.lock();
        let mut count = 0;
        let mut skipped = 0;

        for (key, file) in &manifest.entries {
            let path = self.dir.join(file);
            let loaded = fs::read(&path)
                .map_err(crate::CacheError::from)
                .and_then(|bytes| Ok(bincode::deserialize::<CachedRepository>(&bytes)?));

            match loaded {
                Ok(entry) => {
                    self.entries.insert(key.clone(), entry);
                    count += 1;
                }
                Err(e) => {
                    log::warn!("Failed to load cache entry {}: {}. Skipping.", key, e);
                    skipped += 1;
                }
            }
        }

        if count > 0 {
            log::info!("Loaded {} cached repositories", count);
        }
        if skipped > 0 {
            log::warn!("Skipped {} cache entries due to read errors", skipped);
        }
    }

    /// Get the entry for `key` if it was mined at `tip` with cutoff `since`
    /// and the `include` globs
    ///
    /// A stale entry is invalidated on the way out.
    pub fn get_valid<S: AsRef<str>>(
        &self,
        key: &str,
        tip: &str,
        since: NaiveDate,
        include: &[S],
    ) -> Result<Option<CachedRepository>> {
        let stale = match self.entries.get(key) {
            None => return Ok(None),
            Some(entry) if entry.is_valid_for(tip, since, include) => {
                return Ok(Some(entry.clone()))
            }
            Some(entry) => {
                log::debug!(
                    "Cache entry for {} is stale (tip {} -> {})",
                    key,
                    entry.tip,
                    tip
                );
                true
            }
        };

        if stale {
            self.invalidate(key)?;
        }
        Ok(None)
    }

    /// Get an entry regardless of validity
    pub fn get(&self, key: &str) -> Option<CachedRepository> {
        self.entries.get(key).map(|e| e.clone())
    }

    /// Store an entry, replacing any previous one for the same repository
    pub fn put(&self, entry: CachedRepository) -> Result<()> {
        let key = entry.repository.clone();
        let bytes = bincode::serialize(&entry)?;

        let mut manifest = self.manifest.lock();
        let file = manifest.file_for(&key);
        fs::write(self.dir.join(&file), bytes)?;
        manifest.save(&self.dir)?;
        drop(manifest);

        self.entries.insert(key, entry);
        Ok(())
    }

    /// Drop the entry for `key`; returns whether one existed
    pub fn invalidate(&self, key: &str) -> Result<bool> {
        let removed = self.entries.remove(key).is_some();

        let mut manifest = self.manifest.lock();
        if let Some(file) = manifest.entries.remove(key) {
            let path = self.dir.join(file);
            if path.exists() {
                fs::remove_file(path)?;
            }
            manifest.save(&self.dir)?;
        }

        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
