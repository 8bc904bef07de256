//! Per-repository mining: walks a commit timeline and classifies the record
//! changes of every step.

use super::{
    executor::{CheckoutAttempt, VersionControl},
    parser::{Commit, CommitId},
    scratch::{read_optional, ScratchBuffer},
    timeline::{checkout_with_retry, CheckoutOutcome, CommitTimeline, RetryPolicy},
};
use crate::classify::{classify, DiffOutcome, OutcomeSlots};
use crate::error::{MiningError, MiningResult};
use crate::parser_registry::ParserRegistry;
use crate::snapshot::SnapshotIndexer;
use chrono::{DateTime, Utc};
use globset::GlobSet;
use std::path::Path;

/// Totals of one commit step with at least one non-zero slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitTotals {
    /// Newer commit of the step.
    pub commit: Commit,
    pub slots: OutcomeSlots,
}

/// Result of mining one repository.
#[derive(Debug, Clone)]
pub struct RepositoryAggregate {
    pub repository: String,
    /// Newest commit of the timeline.
    pub tip: CommitId,
    pub totals: OutcomeSlots,
    /// Newest first.
    pub commits: Vec<CommitTotals>,
    /// Steps compared.
    pub steps: usize,
    /// Steps abandoned because of scratch I/O failures.
    pub skipped_steps: usize,
}

impl RepositoryAggregate {
    pub fn new(repository: impl Into<String>, tip: CommitId) -> Self {
        Self {
            repository: repository.into(),
            tip,
            totals: OutcomeSlots::new(),
            commits: Vec::new(),
            steps: 0,
            skipped_steps: 0,
        }
    }

    /// Fold the outcomes of one step into the running totals.
    pub fn fold(&mut self, commit: &Commit, outcomes: &[DiffOutcome]) {
        let mut step = OutcomeSlots::new();
        for outcome in outcomes {
            step += outcome.slots;
        }

        self.steps += 1;
        self.totals += step;
        if !step.is_zero() {
            self.commits.push(CommitTotals {
                commit: commit.clone(),
                slots: step,
            });
        }
    }
}

/// Mines one working tree.
pub struct RepositoryMiner<'a, V: VersionControl + ?Sized> {
    vcs: &'a V,
    parsers: &'a ParserRegistry,
    include: &'a GlobSet,
    scratch: ScratchBuffer,
    retry: RetryPolicy,
}

impl<'a, V: VersionControl + ?Sized> RepositoryMiner<'a, V> {
    pub fn new(
        vcs: &'a V,
        parsers: &'a ParserRegistry,
        include: &'a GlobSet,
        scratch: ScratchBuffer,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            vcs,
            parsers,
            include,
            scratch,
            retry,
        }
    }

    /// Display name of the repository: the working tree's directory name.
    pub fn repository_name(&self) -> String {
        repository_name(self.vcs.work_tree())
    }

    /// Mine every step of the timeline bounded by `since`.
    ///
    /// Returns `None` when the repository has no commits. The original
    /// checkout is restored afterwards, whatever the outcome.
    pub fn mine(&self, since: DateTime<Utc>) -> MiningResult<Option<RepositoryAggregate>> {
        let position = self.vcs.original_position()?;
        let result = self.mine_timeline(since);
        self.restore(&position);
        result
    }

    fn mine_timeline(&self, since: DateTime<Utc>) -> MiningResult<Option<RepositoryAggregate>> {
        let timeline = CommitTimeline::build(self.vcs, since)?;
        let Some(newest) = timeline.newest() else {
            tracing::info!("{} has no commits; skipping", self.repository_name());
            return Ok(None);
        };

        tracing::info!(
            "Mining {} ({} commits since {})",
            self.repository_name(),
            timeline.len(),
            since.date_naive()
        );

        let mut aggregate = RepositoryAggregate::new(self.repository_name(), newest.id.clone());
        self.checkout(newest)?;

        for pair in timeline.commits().windows(2) {
            let (newer, older) = (&pair[0], &pair[1]);
            match self.step(newer, older)? {
                Some(outcomes) => aggregate.fold(newer, &outcomes),
                None => aggregate.skipped_steps += 1,
            }
        }

        tracing::info!(
            "Mined {}: {} steps, {} with record changes, totals {}",
            aggregate.repository,
            aggregate.steps,
            aggregate.commits.len(),
            aggregate.totals
        );
        Ok(Some(aggregate))
    }

    /// Compare `newer` (checked out) against `older`, leaving `older`
    /// checked out. `None` when the step was abandoned.
    fn step(&self, newer: &Commit, older: &Commit) -> MiningResult<Option<Vec<DiffOutcome>>> {
        let paths = self.relevant_changes()?;
        tracing::debug!(
            "Step {} -> {}: {} candidate files",
            newer.id.short(),
            older.id.short(),
            paths.len()
        );

        let captured = self.capture_newer(&paths);
        self.checkout(older)?;

        let present = match captured {
            Ok(present) => present,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!("Skipping step {}: {}", newer.id.short(), e);
                return Ok(None);
            }
        };

        match self.compare(newer, &paths, &present) {
            Ok(outcomes) => Ok(Some(outcomes)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::warn!("Skipping step {}: {}", newer.id.short(), e);
                Ok(None)
            }
        }
    }

    /// Paths changed by `HEAD` that a front end handles and the include
    /// globs accept.
    fn relevant_changes(&self) -> MiningResult<Vec<String>> {
        let mut paths = self.vcs.changed_files()?;
        paths.retain(|p| self.parsers.can_parse(Path::new(p)) && self.include.is_match(p));
        Ok(paths)
    }

    /// Copy the checked-out revision of `paths` into the scratch buffer.
    /// Returns, per ordinal, whether the file exists.
    fn capture_newer(&self, paths: &[String]) -> MiningResult<Vec<bool>> {
        self.scratch.reset().map_err(MiningError::scratch)?;

        let mut present = Vec::with_capacity(paths.len());
        for (ordinal, path) in paths.iter().enumerate() {
            let bytes =
                read_optional(&self.vcs.work_tree().join(path)).map_err(MiningError::scratch)?;
            if let Some(bytes) = &bytes {
                self.scratch
                    .store(ordinal, bytes)
                    .map_err(MiningError::scratch)?;
            }
            present.push(bytes.is_some());
        }
        Ok(present)
    }

    /// Index the older revision from the working tree and the newer one
    /// from the scratch buffer, and classify each file.
    fn compare(
        &self,
        newer: &Commit,
        paths: &[String],
        present: &[bool],
    ) -> MiningResult<Vec<DiffOutcome>> {
        let indexer = SnapshotIndexer::new(self.parsers);
        let mut outcomes = Vec::with_capacity(paths.len());

        for (ordinal, (path, &exists)) in paths.iter().zip(present).enumerate() {
            let older =
                read_optional(&self.vcs.work_tree().join(path)).map_err(MiningError::scratch)?;
            let newer_bytes = if exists {
                Some(self.scratch.load(ordinal).map_err(MiningError::scratch)?)
            } else {
                None
            };

            let before = indexer.index(path, older.as_deref());
            let after = indexer.index(path, newer_bytes.as_deref());
            let slots = classify(&before, &after);

            if !slots.is_zero() {
                tracing::debug!("{} {}: {}", newer.id.short(), path, slots);
            }
            outcomes.push(DiffOutcome {
                commit: newer.id.clone(),
                file_path: path.clone(),
                slots,
            });
        }
        Ok(outcomes)
    }

    fn checkout(&self, commit: &Commit) -> MiningResult<()> {
        match checkout_with_retry(self.vcs, &commit.id, self.retry.attempts, self.retry.backoff)? {
            CheckoutOutcome::Checked { .. } => Ok(()),
            CheckoutOutcome::FailedAfterRetries {
                attempts,
                diagnostic,
            } => Err(MiningError::CheckoutFailed {
                commit: commit.id.to_string(),
                attempts,
                diagnostic,
            }),
        }
    }

    fn restore(&self, position: &str) {
        match self.vcs.restore(position) {
            Ok(CheckoutAttempt::Switched) => {}
            Ok(CheckoutAttempt::Rejected(diagnostic)) => tracing::warn!(
                "Could not restore {} to {}: {}",
                self.repository_name(),
                position,
                diagnostic
            ),
            Err(e) => tracing::warn!(
                "Could not restore {} to {}: {}",
                self.repository_name(),
                position,
                e
            ),
        }
    }
}

/// Directory name of a working tree, or its full path when it has none.
pub fn repository_name(work_tree: &Path) -> String {
    work_tree
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| work_tree.display().to_string())
}
