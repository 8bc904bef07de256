//! Git history mining: commit timelines, checkouts and the per-repository
//! miner.
//!
//! This module provides functionality to:
//! - Read commit records and enumerate a date-bounded timeline
//! - Check out revisions with bounded retry
//! - Classify the record changes of every timeline step

mod error;
mod executor;
#[cfg(test)]
pub(crate) mod fake;
mod miner;
mod parser;
mod scratch;
mod timeline;

pub use error::GitMiningError;
pub use executor::{CheckoutAttempt, GitExecutor, VersionControl};
pub use miner::{repository_name, CommitTotals, RepositoryAggregate, RepositoryMiner};
pub use parser::{parse_commit_record, Commit, CommitId};
pub use scratch::ScratchBuffer;
pub use timeline::{checkout_with_retry, cutoff, CheckoutOutcome, CommitTimeline, RetryPolicy};
