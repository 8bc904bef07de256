//! Date-bounded commit timelines and bounded checkout retry.

use super::error::Result;
use super::executor::{CheckoutAttempt, VersionControl};
use super::parser::{Commit, CommitId};
use chrono::{DateTime, NaiveDate, Utc};
use std::time::Duration;

/// Start of `date` in UTC.
pub fn cutoff(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Newest-first commit trace of one repository.
#[derive(Debug, Clone, Default)]
pub struct CommitTimeline {
    commits: Vec<Commit>,
}

impl CommitTimeline {
    /// Walk `HEAD`, `HEAD~1`, ... and stop after the first commit at or
    /// before `since` (which is kept), or when history runs out.
    pub fn build<V: VersionControl + ?Sized>(vcs: &V, since: DateTime<Utc>) -> Result<Self> {
        let mut commits = Vec::new();

        for back in 0usize.. {
            let revision = if back == 0 {
                "HEAD".to_string()
            } else {
                format!("HEAD~{back}")
            };
            let Some(commit) = vcs.commit_record(&revision)? else {
                break;
            };
            let reached = commit.timestamp <= since;
            commits.push(commit);
            if reached {
                break;
            }
        }

        tracing::debug!(
            "Timeline of {} has {} commits",
            vcs.work_tree().display(),
            commits.len()
        );
        Ok(Self { commits })
    }

    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    pub fn newest(&self) -> Option<&Commit> {
        self.commits.first()
    }
}

/// How often, and how patiently, a rejected checkout is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(250),
        }
    }
}

/// Result of [`checkout_with_retry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Checked { attempts: u32 },
    FailedAfterRetries { attempts: u32, diagnostic: String },
}

/// Check out `id`, trying up to `attempts` times with `backoff` between
/// rejected attempts. At least one attempt is always made.
pub fn checkout_with_retry<V: VersionControl + ?Sized>(
    vcs: &V,
    id: &CommitId,
    attempts: u32,
    backoff: Duration,
) -> Result<CheckoutOutcome> {
    let attempts = attempts.max(1);
    let mut diagnostic = String::new();

    for attempt in 1..=attempts {
        match vcs.checkout(id)? {
            CheckoutAttempt::Switched => {
                return Ok(CheckoutOutcome::Checked { attempts: attempt });
            }
            CheckoutAttempt::Rejected(message) => {
                tracing::warn!(
                    "Checkout of {} rejected (attempt {}/{}): {}",
                    id.short(),
                    attempt,
                    attempts,
                    message
                );
                diagnostic = message;
                if attempt < attempts && !backoff.is_zero() {
                    std::thread::sleep(backoff);
                }
            }
        }
    }

    Ok(CheckoutOutcome::FailedAfterRetries {
        attempts,
        diagnostic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git_mining::fake::FakeRepo;

    fn five_commits() -> FakeRepo {
        let mut repo = FakeRepo::new();
        repo.commit("2021-01-01T10:00:00Z", &[("A.java", Some("class A {}"))]);
        repo.commit("2021-02-01T10:00:00Z", &[("A.java", Some("record A() {}"))]);
        repo.commit("2021-03-01T10:00:00Z", &[("B.java", Some("class B {}"))]);
        repo.commit("2021-04-01T10:00:00Z", &[("B.java", None)]);
        repo.commit("2021-05-01T10:00:00Z", &[("C.java", Some("record C() {}"))]);
        repo
    }

    fn day(s: &str) -> DateTime<Utc> {
        cutoff(NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap())
    }

    #[test]
    fn test_build_stops_at_first_commit_before_cutoff() {
        let repo = five_commits();
        let timeline = CommitTimeline::build(&repo, day("2021-02-15")).unwrap();

        let ids: Vec<_> = timeline.commits().iter().map(|c| c.id.clone()).collect();
        let all = repo.ids();
        assert_eq!(ids, vec![all[4].clone(), all[3].clone(), all[2].clone(), all[1].clone()]);

        let stamps: Vec<_> = timeline.commits().iter().map(|c| c.timestamp).collect();
        assert!(stamps.windows(2).all(|w| w[0] > w[1]));
        assert!(timeline.commits().last().unwrap().timestamp <= day("2021-02-15"));
    }

    #[test]
    fn test_build_includes_commit_exactly_at_cutoff() {
        let mut repo = FakeRepo::new();
        repo.commit("2021-03-01T00:00:00Z", &[("A.java", Some("class A {}"))]);
        repo.commit("2021-03-02T00:00:00Z", &[("A.java", Some("class A { }"))]);

        let timeline = CommitTimeline::build(&repo, day("2021-03-01")).unwrap();
        assert_eq!(timeline.len(), 2);
    }

    #[test]
    fn test_build_exhausts_history_after_cutoff() {
        let repo = five_commits();
        let timeline = CommitTimeline::build(&repo, day("2020-01-01")).unwrap();

        assert_eq!(timeline.len(), 5);
        assert_eq!(timeline.newest().unwrap().id, repo.ids()[4]);
    }

    #[test]
    fn test_build_on_commit_older_than_cutoff() {
        let repo = five_commits();
        let timeline = CommitTimeline::build(&repo, day("2022-01-01")).unwrap();
        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn test_retry_succeeds_after_transient_failures() {
        let repo = five_commits();
        let target = repo.ids()[2].clone();
        repo.fail_checkout(&target, 2);

        let outcome = checkout_with_retry(&repo, &target, 3, Duration::ZERO).unwrap();
        assert_eq!(outcome, CheckoutOutcome::Checked { attempts: 3 });
        assert_eq!(repo.head_index(), 2);
    }

    #[test]
    fn test_retry_gives_up_with_diagnostic() {
        let repo = five_commits();
        let target = repo.ids()[1].clone();
        repo.fail_checkout(&target, 10);

        let outcome = checkout_with_retry(&repo, &target, 2, Duration::ZERO).unwrap();
        assert_eq!(
            outcome,
            CheckoutOutcome::FailedAfterRetries {
                attempts: 2,
                diagnostic: "index.lock exists".into()
            }
        );
        assert_eq!(repo.checkouts.borrow().len(), 2);
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let repo = five_commits();
        let target = repo.ids()[0].clone();

        let outcome = checkout_with_retry(&repo, &target, 0, Duration::ZERO).unwrap();
        assert_eq!(outcome, CheckoutOutcome::Checked { attempts: 1 });
    }

    #[test]
    fn test_checkout_is_idempotent() {
        let repo = five_commits();
        let target = repo.ids()[3].clone();

        for _ in 0..2 {
            let outcome = checkout_with_retry(&repo, &target, 1, Duration::ZERO).unwrap();
            assert_eq!(outcome, CheckoutOutcome::Checked { attempts: 1 });
        }
        assert_eq!(repo.head_index(), 3);
    }
}
