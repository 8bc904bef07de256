//! recordscope mining cache
//!
//! Persistent per-repository cache of record mining results, so that a
//! repository whose history has not moved is not walked again.
//!
//! ## Invalidation
//!
//! - An entry is keyed by repository identity (the canonical working-tree path)
//! - It is valid only while the tip commit, the cutoff date and the include
//!   globs it was mined with are unchanged; a stale entry is dropped on lookup
//! - A manifest written by an older cache format discards every entry
//!
//! ## Example
//!
//! ```ignore
//! use recordscope_cache::{CachedRepository, MiningCache};
//!
//! let cache = MiningCache::open(&cache_dir)?;
//! if let Some(hit) = cache.get_valid(&repo_key, &tip, since, &include)? {
//!     return Ok(hit);
//! }
//! cache.put(CachedRepository::new(repo_key, tip, since, totals, commits).with_include(&include))?;
//! ```

pub mod entry;
pub mod error;
pub mod migration;
pub mod storage;

pub use entry::{CachedCommit, CachedRepository, SlotCounts, SLOT_COUNT};
pub use error::{CacheError, Result};
pub use storage::MiningCache;
