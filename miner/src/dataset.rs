//! Dataset loop: mines every repository of a batch in turn, consulting the
//! mining cache and writing report rows as each repository finishes.

use crate::config::MiningConfig;
use crate::error::MiningResult;
use crate::git_mining::{
    repository_name, GitExecutor, RepositoryAggregate, RepositoryMiner, ScratchBuffer,
    VersionControl,
};
use crate::parser_registry::ParserRegistry;
use crate::report::ReportWriter;
use chrono::NaiveDate;
use globset::GlobSet;
use recordscope_cache::{CachedCommit, CachedRepository, MiningCache};
use std::io::Write;
use std::path::{Path, PathBuf};

/// How one repository of the batch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryStatus {
    Mined,
    /// Served from the mining cache.
    Cached,
    /// No commits to mine.
    Skipped,
}

/// Counts logged at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatasetSummary {
    pub mined: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cache_hits: usize,
}

impl DatasetSummary {
    pub fn total(&self) -> usize {
        self.mined + self.skipped + self.failed + self.cache_hits
    }
}

/// Expand repository arguments into a sorted, de-duplicated list of
/// working trees. An argument is either a working tree or a directory whose
/// immediate children are working trees.
pub fn discover_repositories(roots: &[PathBuf]) -> MiningResult<Vec<PathBuf>> {
    let mut found = Vec::new();

    for root in roots {
        if GitExecutor::is_work_tree(root) {
            found.push(root.clone());
            continue;
        }
        if !root.is_dir() {
            tracing::warn!("Ignoring {}: not a directory", root.display());
            continue;
        }
        for entry in std::fs::read_dir(root)? {
            let path = entry?.path();
            if path.is_dir() && GitExecutor::is_work_tree(&path) {
                found.push(path);
            }
        }
    }

    found.sort();
    found.dedup();
    Ok(found)
}

/// Cache entry describing `aggregate`, keyed by `key`, mined with cutoff
/// `since` over paths accepted by `include`.
pub fn cache_entry(
    key: &str,
    aggregate: &RepositoryAggregate,
    since: NaiveDate,
    include: &[String],
) -> CachedRepository {
    let commits = aggregate
        .commits
        .iter()
        .map(|c| CachedCommit {
            commit: c.commit.id.to_string(),
            author: c.commit.author.clone(),
            timestamp: c.commit.timestamp,
            slots: c.slots.counts(),
        })
        .collect();

    CachedRepository::new(
        key,
        aggregate.tip.as_str(),
        since,
        aggregate.totals.counts(),
        commits,
    )
    .with_include(include)
}

/// Mines a batch of repositories.
pub struct DatasetMiner {
    config: MiningConfig,
    parsers: ParserRegistry,
    include: GlobSet,
    cache: Option<MiningCache>,
}

impl DatasetMiner {
    pub fn new(config: MiningConfig) -> MiningResult<Self> {
        config.validate()?;
        let include = config.include_set()?;
        let cache = match &config.cache_dir {
            Some(dir) => Some(MiningCache::open(dir)?),
            None => None,
        };

        Ok(Self {
            config,
            parsers: ParserRegistry::new(),
            include,
            cache,
        })
    }

    pub fn config(&self) -> &MiningConfig {
        &self.config
    }

    /// Mine every repository named by the configuration, in path order.
    ///
    /// Failures abort only the repository they occur in, unless they are
    /// fatal.
    pub fn run<W: Write>(&self, report: &mut ReportWriter<W>) -> MiningResult<DatasetSummary> {
        let repositories = discover_repositories(&self.config.repos)?;
        tracing::info!("Mining {} repositories", repositories.len());

        let mut summary = DatasetSummary::default();
        for path in &repositories {
            match self.mine_repository(path, report) {
                Ok(RepositoryStatus::Mined) => summary.mined += 1,
                Ok(RepositoryStatus::Cached) => summary.cache_hits += 1,
                Ok(RepositoryStatus::Skipped) => summary.skipped += 1,
                Err(e) if e.is_fatal() => {
                    tracing::error!("Stopping batch at {}: {}", path.display(), e);
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!("Failed to mine {}: {}", path.display(), e);
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            "Dataset done: {} mined, {} skipped, {} failed, {} cache hits",
            summary.mined,
            summary.skipped,
            summary.failed,
            summary.cache_hits
        );
        Ok(summary)
    }

    /// Mine one working tree and write its report rows.
    pub fn mine_repository<W: Write>(
        &self,
        path: &Path,
        report: &mut ReportWriter<W>,
    ) -> MiningResult<RepositoryStatus> {
        let executor = GitExecutor::new(path)?;
        let key = std::fs::canonicalize(path)?.display().to_string();
        let name = repository_name(path);

        if let Some(entry) = self.cached(&executor, &key)? {
            tracing::info!("{} unchanged since last run; using cached results", name);
            report.write_repository(&name, &entry)?;
            return Ok(RepositoryStatus::Cached);
        }

        let miner = RepositoryMiner::new(
            &executor,
            &self.parsers,
            &self.include,
            ScratchBuffer::new(&self.config.scratch_dir),
            self.config.retry_policy(),
        );
        let Some(aggregate) = miner.mine(self.config.cutoff())? else {
            return Ok(RepositoryStatus::Skipped);
        };

        let entry = cache_entry(&key, &aggregate, self.config.since, &self.config.include);
        report.write_repository(&name, &entry)?;
        if let Some(cache) = &self.cache {
            cache.put(entry)?;
        }
        Ok(RepositoryStatus::Mined)
    }

    fn cached(&self, vcs: &dyn VersionControl, key: &str) -> MiningResult<Option<CachedRepository>> {
        let Some(cache) = &self.cache else {
            return Ok(None);
        };
        // A repository without commits has no tip to validate against.
        let Ok(tip) = vcs.head() else {
            return Ok(None);
        };
        Ok(cache.get_valid(
            key,
            tip.as_str(),
            self.config.since,
            &self.config.include,
        )?)
    }
}
