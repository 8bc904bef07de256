//! Parsing of `git log` commit records.

use super::error::{GitMiningError, Result};
use chrono::{DateTime, FixedOffset, Timelike};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Arguments producing one record in the shape [`parse_commit_record`] reads.
pub const RECORD_FORMAT: [&str; 5] = [
    "log",
    "-1",
    "--no-decorate",
    "--format=medium",
    "--date=iso-strict",
];

/// Hexadecimal object name of a commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommitId(String);

impl CommitId {
    /// Accepts 4 to 64 hex digits; the id is stored lowercase.
    pub fn parse(hex: &str) -> Option<Self> {
        let hex = hex.trim();
        let valid = (4..=64).contains(&hex.len()) && hex.chars().all(|c| c.is_ascii_hexdigit());
        valid.then(|| Self(hex.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 8 digits, for log lines.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(8)]
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One commit of a timeline. Identity is the id.
#[derive(Debug, Clone)]
pub struct Commit {
    pub id: CommitId,
    pub author: String,
    /// Author date, minute precision.
    pub timestamp: DateTime<FixedOffset>,
}

impl PartialEq for Commit {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Commit {}

impl std::hash::Hash for Commit {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

fn header_patterns() -> Option<&'static (Regex, Regex, Regex)> {
    static PATTERNS: OnceLock<Option<(Regex, Regex, Regex)>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            let commit = Regex::new(r"^commit ([0-9a-fA-F]{4,64})\s*$").ok()?;
            let author = Regex::new(r"^Author:\s*(.*?)\s*$").ok()?;
            let date = Regex::new(r"^Date:\s*(\S+)\s*$").ok()?;
            Some((commit, author, date))
        })
        .as_ref()
}

/// Parse the header of one `git log --format=medium --date=iso-strict` record.
///
/// The `Merge:` line of merge commits is skipped. Any other deviation from
/// `commit`, `Author:`, `Date:` is an [`GitMiningError::UnparsableHistory`].
pub fn parse_commit_record(revision: &str, record: &str) -> Result<Commit> {
    let (commit_re, author_re, date_re) = header_patterns()
        .ok_or_else(|| GitMiningError::unparsable(revision, "record patterns unavailable"))?;

    let mut lines = record.lines().filter(|l| !l.starts_with("Merge:"));

    let first = lines
        .next()
        .ok_or_else(|| GitMiningError::unparsable(revision, "empty record"))?;
    let id = commit_re
        .captures(first)
        .and_then(|c| CommitId::parse(&c[1]))
        .ok_or_else(|| GitMiningError::unparsable(revision, format!("bad commit line: {first}")))?;

    let author_line = lines.next().unwrap_or_default();
    let author = author_re
        .captures(author_line)
        .map(|c| c[1].to_string())
        .ok_or_else(|| {
            GitMiningError::unparsable(revision, format!("bad author line: {author_line}"))
        })?;

    let date_line = lines.next().unwrap_or_default();
    let raw_date = date_re
        .captures(date_line)
        .map(|c| c[1].to_string())
        .ok_or_else(|| GitMiningError::unparsable(revision, format!("bad date line: {date_line}")))?;

    let timestamp = DateTime::parse_from_rfc3339(&raw_date)
        .ok()
        .and_then(truncate_to_minute)
        .ok_or_else(|| GitMiningError::unparsable(revision, format!("bad date: {raw_date}")))?;

    Ok(Commit {
        id,
        author,
        timestamp,
    })
}

fn truncate_to_minute(ts: DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
    ts.with_second(0)?.with_nanosecond(0)
}
