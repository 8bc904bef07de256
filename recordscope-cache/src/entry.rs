//! Cached mining results
//!
//! One [`CachedRepository`] holds everything the miner reports for a single
//! repository, together with the inputs it was computed from. An entry is
//! only reusable while those inputs are unchanged.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Number of outcome slots tracked per commit and per repository
pub const SLOT_COUNT: usize = 9;

/// Raw outcome slot counters, in report column order
pub type SlotCounts = [u64; SLOT_COUNT];

/// Totals for one commit step that produced at least one non-zero slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedCommit {
    /// Object name of the newer commit of the step
    pub commit: String,
    pub author: String,
    pub timestamp: DateTime<FixedOffset>,
    pub slots: SlotCounts,
}

/// Mining results for one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedRepository {
    /// Repository identity (canonical working-tree path)
    pub repository: String,

    /// Tip commit the repository was mined at
    pub tip: String,

    /// Cutoff date the commit trace was bounded by
    pub since: NaiveDate,

    /// Include globs the changed paths were filtered with, sorted
    #[serde(default)]
    pub include: Vec<String>,

    pub totals: SlotCounts,

    #[serde(default)]
    pub commits: Vec<CachedCommit>,

    /// When this entry was recorded
    pub mined_at: DateTime<Utc>,
}

impl CachedRepository {
    /// Create an entry recorded now
    pub fn new(
        repository: impl Into<String>,
        tip: impl Into<String>,
        since: NaiveDate,
        totals: SlotCounts,
        commits: Vec<CachedCommit>,
    ) -> Self {
        Self {
            repository: repository.into(),
            tip: tip.into(),
            since,
            include: Vec::new(),
            totals,
            commits,
            mined_at: Utc::now(),
        }
    }

    /// Record the include globs the entry was mined with
    pub fn with_include<S: AsRef<str>>(mut self, patterns: &[S]) -> Self {
        self.include = normalize_include(patterns);
        self
    }

    /// Check whether this entry still describes the repository
    ///
    /// The entry is stale as soon as the tip moved, the trace was bounded
    /// by a different cutoff, or a different set of include globs applies.
    /// Pattern order and duplicates do not matter.
    pub fn is_valid_for<S: AsRef<str>>(&self, tip: &str, since: NaiveDate, include: &[S]) -> bool {
        self.tip == tip && self.since == since && self.include == normalize_include(include)
    }
}

fn normalize_include<S: AsRef<str>>(patterns: &[S]) -> Vec<String> {
    let mut include: Vec<String> = patterns.iter().map(|p| p.as_ref().to_string()).collect();
    include.sort();
    include.dedup();
    include
}
