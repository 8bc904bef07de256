//! recordscope record miner library
//!
//! Walks the recent history of Java repositories and counts, per commit and
//! per repository, how record declarations were introduced, converted,
//! changed and removed.

pub mod classify;
pub mod config;
pub mod dataset;
pub mod declaration;
pub mod error;
pub mod git_mining;
pub mod parser_registry;
pub mod report;
pub mod snapshot;

pub use classify::{classify, DiffOutcome, OutcomeSlots, Slot};
pub use config::{ConfigError, MiningConfig};
pub use dataset::{DatasetMiner, DatasetSummary};
pub use error::{MiningError, MiningResult};
pub use parser_registry::ParserRegistry;
pub use snapshot::{SnapshotIndexer, SourceSnapshot};
