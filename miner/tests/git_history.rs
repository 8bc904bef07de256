//! End-to-end mining against real git repositories.
//!
//! Every test returns early when no `git` binary is available.

use chrono::NaiveDate;
use recordscope_miner::git_mining::{
    cutoff, CommitTimeline, GitExecutor, VersionControl,
};
use recordscope_miner::report::ReportWriter;
use recordscope_miner::{DatasetMiner, MiningConfig};
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str], date: &str) {
    let output = Command::new("git")
        .current_dir(dir)
        .args([
            "-c",
            "user.name=Dev",
            "-c",
            "user.email=dev@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .env("GIT_AUTHOR_DATE", date)
        .env("GIT_COMMITTER_DATE", date)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn init(dir: &Path) {
    std::fs::create_dir_all(dir).unwrap();
    git(dir, &["init", "-q"], "2021-01-01T00:00:00Z");
    git(dir, &["symbolic-ref", "HEAD", "refs/heads/main"], "2021-01-01T00:00:00Z");
}

fn commit(dir: &Path, date: &str, files: &[(&str, Option<&str>)]) {
    for (path, content) in files {
        let target = dir.join(path);
        match content {
            Some(content) => {
                std::fs::create_dir_all(target.parent().unwrap()).unwrap();
                std::fs::write(&target, content).unwrap();
            }
            None => std::fs::remove_file(&target).unwrap(),
        }
    }
    git(dir, &["add", "-A"], date);
    git(dir, &["commit", "-q", "-m", "change"], date);
}

fn sample_repo(dir: &Path) {
    init(dir);
    commit(dir, "2021-01-10T10:00:00Z", &[("src/A.java", Some("class A {}\n"))]);
    commit(dir, "2021-02-10T10:00:00Z", &[("src/A.java", Some("record A(int v) {}\n"))]);
    commit(
        dir,
        "2021-03-10T10:00:00Z",
        &[(
            "src/B.java",
            Some("record B(int x) {}\nrecord C() {}\nclass D {}\n"),
        )],
    );
    commit(
        dir,
        "2021-04-10T10:00:00Z",
        &[("src/B.java", None), ("README.md", Some("docs\n"))],
    );
}

fn current_branch(dir: &Path) -> String {
    let output = Command::new("git")
        .current_dir(dir)
        .args(["symbolic-ref", "--short", "HEAD"])
        .output()
        .unwrap();
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

fn config(repos: &Path, work: &Path) -> MiningConfig {
    MiningConfig {
        repos: vec![repos.to_path_buf()],
        since: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        scratch_dir: work.join("scratch"),
        output_dir: work.join("out"),
        cache_dir: Some(work.join("cache")),
        checkout_backoff_ms: 0,
        ..Default::default()
    }
}

fn run(config: &MiningConfig) -> (recordscope_miner::DatasetSummary, String, String) {
    let mut report = ReportWriter::create(&config.output_dir).unwrap();
    let summary = DatasetMiner::new(config.clone())
        .unwrap()
        .run(&mut report)
        .unwrap();
    drop(report);

    let repos = std::fs::read_to_string(config.repositories_report()).unwrap();
    let commits = std::fs::read_to_string(config.commits_report()).unwrap();
    (summary, repos, commits)
}

#[test]
fn test_mine_repository_end_to_end() {
    if !git_available() {
        return;
    }
    let repos = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let alpha = repos.path().join("alpha");
    sample_repo(&alpha);

    let (summary, repositories, commits) = run(&config(repos.path(), work.path()));

    assert_eq!(summary.mined, 1);
    assert_eq!(summary.failed, 0);
    let rows: Vec<&str> = repositories.lines().collect();
    assert_eq!(rows[1], "alpha,2,1,0,0,2,0,0,0,0");

    let commit_rows: Vec<&str> = commits.lines().skip(1).collect();
    assert_eq!(commit_rows.len(), 3);
    assert!(commit_rows[0].ends_with(",0,0,0,0,2,0,0,0,0"));
    assert!(commit_rows[0].contains("2021-04-10T10:00+00:00"));
    assert!(commit_rows[1].ends_with(",2,0,0,0,0,0,0,0,0"));
    assert!(commit_rows[2].ends_with(",0,1,0,0,0,0,0,0,0"));

    assert_eq!(current_branch(&alpha), "main");
}

#[test]
fn test_second_run_uses_cache_until_history_moves() {
    if !git_available() {
        return;
    }
    let repos = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let alpha = repos.path().join("alpha");
    sample_repo(&alpha);
    let config = config(repos.path(), work.path());

    let (first, first_repos, _) = run(&config);
    assert_eq!(first.mined, 1);

    let (second, second_repos, _) = run(&config);
    assert_eq!(second.cache_hits, 1);
    assert_eq!(second.mined, 0);
    assert_eq!(first_repos, second_repos);

    commit(
        &alpha,
        "2021-05-10T10:00:00Z",
        &[("src/E.java", Some("record E() {}\n"))],
    );
    let (third, third_repos, _) = run(&config);
    assert_eq!(third.mined, 1);
    assert!(third_repos.contains("alpha,3,1,0,0,2,0,0,0,0"));
}

#[test]
fn test_changed_include_globs_bypass_cache() {
    if !git_available() {
        return;
    }
    let repos = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let alpha = repos.path().join("alpha");
    init(&alpha);
    commit(&alpha, "2021-01-10T10:00:00Z", &[("README.md", Some("docs\n"))]);
    commit(
        &alpha,
        "2021-02-10T10:00:00Z",
        &[
            ("src/A.java", Some("record A() {}\n")),
            ("test/B.java", Some("record B() {}\n")),
        ],
    );

    let all = config(repos.path(), work.path());
    let (first, first_repos, _) = run(&all);
    assert_eq!(first.mined, 1);
    assert!(first_repos.contains("alpha,2,0,0,0,0,0,0,0,0"));

    let narrowed = MiningConfig {
        include: vec!["src/**/*.java".to_string()],
        ..all
    };
    let (second, second_repos, _) = run(&narrowed);
    assert_eq!(second.cache_hits, 0);
    assert_eq!(second.mined, 1);
    assert!(second_repos.contains("alpha,1,0,0,0,0,0,0,0,0"));
}

#[test]
fn test_cutoff_bounds_the_timeline() {
    if !git_available() {
        return;
    }
    let dir = TempDir::new().unwrap();
    sample_repo(dir.path());
    let executor = GitExecutor::new(dir.path()).unwrap();

    let since = cutoff(NaiveDate::from_ymd_opt(2021, 2, 20).unwrap());
    let timeline = CommitTimeline::build(&executor, since).unwrap();

    assert_eq!(timeline.len(), 3);
    let oldest = timeline.commits().last().unwrap();
    assert_eq!(oldest.timestamp.to_rfc3339(), "2021-02-10T10:00:00+00:00");
    assert_eq!(oldest.author, "Dev <dev@example.com>");
}

#[test]
fn test_timeline_walks_through_merges() {
    if !git_available() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    init(root);
    commit(root, "2021-01-01T10:00:00Z", &[("A.java", Some("class A {}\n"))]);
    git(root, &["checkout", "-q", "-b", "topic"], "2021-01-02T10:00:00Z");
    commit(root, "2021-01-02T10:00:00Z", &[("B.java", Some("record B() {}\n"))]);
    git(root, &["checkout", "-q", "main"], "2021-01-03T10:00:00Z");
    commit(root, "2021-01-03T10:00:00Z", &[("C.java", Some("class C {}\n"))]);
    git(
        root,
        &["merge", "-q", "--no-ff", "-m", "merge topic", "topic"],
        "2021-01-04T10:00:00Z",
    );

    let executor = GitExecutor::new(root).unwrap();
    let since = cutoff(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
    let timeline = CommitTimeline::build(&executor, since).unwrap();

    // First-parent walk: merge, C, A.
    assert_eq!(timeline.len(), 3);

    let mut changed = executor.changed_files().unwrap();
    changed.sort();
    assert_eq!(changed, vec!["B.java"]);
}

#[test]
fn test_root_commit_lists_introduced_files() {
    if !git_available() {
        return;
    }
    let dir = TempDir::new().unwrap();
    init(dir.path());
    commit(
        dir.path(),
        "2021-01-01T10:00:00Z",
        &[("a/P.java", Some("record P() {}\n")), ("b/Q.java", Some("class Q {}\n"))],
    );

    let executor = GitExecutor::new(dir.path()).unwrap();
    let mut changed = executor.changed_files().unwrap();
    changed.sort();
    assert_eq!(changed, vec!["a/P.java", "b/Q.java"]);
    assert_eq!(executor.original_position().unwrap(), "main");
}
