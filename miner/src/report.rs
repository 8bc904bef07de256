//! CSV report sink: one row per repository and one per commit with record
//! changes.

use crate::classify::Slot;
use crate::error::MiningResult;
use recordscope_cache::{CachedRepository, SlotCounts};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Minute-precision timestamp column.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M%:z";

fn slot_headers() -> impl Iterator<Item = &'static str> {
    Slot::ALL.iter().map(|s| s.column())
}

fn slot_fields(slots: &SlotCounts) -> impl Iterator<Item = String> + '_ {
    slots.iter().map(u64::to_string)
}

/// Keeps the I/O kind so a full disk stays recognisable.
fn flush_error<W>(err: csv::IntoInnerError<W>) -> std::io::Error {
    std::io::Error::new(err.error().kind(), err.error().to_string())
}

/// Writes `repositories.csv` and `commits.csv` rows as repositories finish.
pub struct ReportWriter<W: Write> {
    repositories: csv::Writer<W>,
    commits: csv::Writer<W>,
}

impl ReportWriter<File> {
    /// Create both report files under `dir`, truncating existing ones.
    pub fn create(dir: &Path) -> MiningResult<Self> {
        std::fs::create_dir_all(dir)?;
        let repositories = File::create(dir.join("repositories.csv"))?;
        let commits = File::create(dir.join("commits.csv"))?;
        Self::new(repositories, commits)
    }
}

impl<W: Write> ReportWriter<W> {
    /// Wrap two sinks and write the header rows.
    pub fn new(repositories: W, commits: W) -> MiningResult<Self> {
        let mut repositories = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(repositories);
        let mut commits = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(commits);

        repositories.write_record(std::iter::once("repository").chain(slot_headers()))?;
        commits.write_record(
            ["repository", "commit", "author", "timestamp"]
                .into_iter()
                .chain(slot_headers()),
        )?;
        repositories.flush()?;
        commits.flush()?;

        Ok(Self {
            repositories,
            commits,
        })
    }

    /// Write the rows of one repository and flush both files.
    pub fn write_repository(&mut self, name: &str, entry: &CachedRepository) -> MiningResult<()> {
        self.repositories.write_record(
            std::iter::once(name.to_string()).chain(slot_fields(&entry.totals)),
        )?;

        for commit in &entry.commits {
            let fields = [
                name.to_string(),
                commit.commit.clone(),
                commit.author.clone(),
                commit.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            ];
            self.commits
                .write_record(fields.into_iter().chain(slot_fields(&commit.slots)))?;
        }

        self.repositories.flush()?;
        self.commits.flush()?;
        Ok(())
    }

    /// Recover the underlying sinks.
    pub fn into_inner(self) -> MiningResult<(W, W)> {
        let repositories = self.repositories.into_inner().map_err(flush_error)?;
        let commits = self.commits.into_inner().map_err(flush_error)?;
        Ok((repositories, commits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate};
    use recordscope_cache::CachedCommit;
    use tempfile::TempDir;

    fn entry() -> CachedRepository {
        CachedRepository::new(
            "/work/alpha",
            "4f2a9c1d",
            NaiveDate::from_ymd_opt(2020, 3, 17).unwrap(),
            [2, 1, 0, 0, 0, 0, 0, 0, 1],
            vec![CachedCommit {
                commit: "4f2a9c1d".into(),
                author: "Ada, Countess <ada@example.com>".into(),
                timestamp: DateTime::parse_from_rfc3339("2021-06-14T09:41:00+02:00").unwrap(),
                slots: [2, 1, 0, 0, 0, 0, 0, 0, 1],
            }],
        )
    }

    #[test]
    fn test_rows_and_headers() {
        let mut writer = ReportWriter::new(Vec::new(), Vec::new()).unwrap();
        writer.write_repository("alpha", &entry()).unwrap();
        let (repos, commits) = writer.into_inner().unwrap();

        let repos = String::from_utf8(repos).unwrap();
        assert_eq!(
            repos,
            "repository,new_file,class_to_record,added_to_file,residual_added,\
deleted_file,record_to_class,removed_from_file,residual_removed,content_changed\n\
alpha,2,1,0,0,0,0,0,0,1\n"
        );

        let commits = String::from_utf8(commits).unwrap();
        let lines: Vec<&str> = commits.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("repository,commit,author,timestamp,new_file"));
        assert_eq!(
            lines[1],
            "alpha,4f2a9c1d,\"Ada, Countess <ada@example.com>\",2021-06-14T09:41+02:00,2,1,0,0,0,0,0,0,1"
        );
    }

    #[test]
    fn test_create_writes_files_incrementally() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let mut writer = ReportWriter::create(&out).unwrap();

        writer.write_repository("alpha", &entry()).unwrap();

        // Rows are on disk before the writer is dropped.
        let repos = std::fs::read_to_string(out.join("repositories.csv")).unwrap();
        assert_eq!(repos.lines().count(), 2);
        let commits = std::fs::read_to_string(out.join("commits.csv")).unwrap();
        assert_eq!(commits.lines().count(), 2);
    }
}
