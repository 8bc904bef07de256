//! In-memory repository standing in for git in tests.

use super::error::{GitMiningError, Result};
use super::executor::{CheckoutAttempt, VersionControl};
use super::parser::{Commit, CommitId};
use chrono::{DateTime, FixedOffset};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tempfile::TempDir;

pub type Tree = BTreeMap<String, Vec<u8>>;

/// Linear history whose working tree is materialised in a temp dir.
pub struct FakeRepo {
    dir: TempDir,
    /// Oldest first.
    history: Vec<(Commit, Tree)>,
    head: Cell<usize>,
    detached: Cell<bool>,
    failures: RefCell<HashMap<CommitId, usize>>,
    pub checkouts: RefCell<Vec<String>>,
}

impl FakeRepo {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            history: Vec::new(),
            head: Cell::new(0),
            detached: Cell::new(false),
            failures: RefCell::new(HashMap::new()),
            checkouts: RefCell::new(Vec::new()),
        }
    }

    /// Append a commit whose tree is the previous tree with `changes`
    /// applied (`None` deletes). `HEAD` moves to it.
    pub fn commit(&mut self, timestamp: &str, changes: &[(&str, Option<&str>)]) -> CommitId {
        let mut tree = self.history.last().map(|(_, t)| t.clone()).unwrap_or_default();
        for (path, content) in changes {
            match content {
                Some(c) => tree.insert(path.to_string(), c.as_bytes().to_vec()),
                None => tree.remove(*path),
            };
        }

        let id = CommitId::parse(&format!("{:040x}", self.history.len() + 0xc0ffee)).unwrap();
        let commit = Commit {
            id: id.clone(),
            author: "Dev <dev@example.com>".into(),
            timestamp: DateTime::<FixedOffset>::parse_from_rfc3339(timestamp).unwrap(),
        };
        self.history.push((commit, tree));
        self.head.set(self.history.len() - 1);
        self.materialise();
        id
    }

    /// Make the next `times` checkouts of `id` fail.
    pub fn fail_checkout(&self, id: &CommitId, times: usize) {
        self.failures.borrow_mut().insert(id.clone(), times);
    }

    pub fn head_index(&self) -> usize {
        self.head.get()
    }

    pub fn is_detached(&self) -> bool {
        self.detached.get()
    }

    pub fn ids(&self) -> Vec<CommitId> {
        self.history.iter().map(|(c, _)| c.id.clone()).collect()
    }

    fn materialise(&self) {
        let root = self.dir.path();
        for entry in std::fs::read_dir(root).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                std::fs::remove_dir_all(&path).unwrap();
            } else {
                std::fs::remove_file(&path).unwrap();
            }
        }
        if let Some((_, tree)) = self.history.get(self.head.get()) {
            for (path, bytes) in tree {
                let target = root.join(path);
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent).unwrap();
                }
                std::fs::write(target, bytes).unwrap();
            }
        }
    }

    fn position_of(&self, id: &CommitId) -> Option<usize> {
        self.history.iter().position(|(c, _)| &c.id == id)
    }
}

impl VersionControl for FakeRepo {
    fn work_tree(&self) -> &Path {
        self.dir.path()
    }

    fn commit_record(&self, revision: &str) -> Result<Option<Commit>> {
        let back = match revision {
            "HEAD" => 0,
            r => r
                .strip_prefix("HEAD~")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| GitMiningError::unparsable(revision, "unknown revision"))?,
        };
        Ok(self
            .head
            .get()
            .checked_sub(back)
            .and_then(|i| self.history.get(i))
            .map(|(commit, _)| commit.clone()))
    }

    fn checkout(&self, id: &CommitId) -> Result<CheckoutAttempt> {
        self.checkouts.borrow_mut().push(id.to_string());
        if let Some(left) = self.failures.borrow_mut().get_mut(id) {
            if *left > 0 {
                *left -= 1;
                return Ok(CheckoutAttempt::Rejected("index.lock exists".into()));
            }
        }
        match self.position_of(id) {
            Some(i) => {
                self.head.set(i);
                self.detached.set(true);
                self.materialise();
                Ok(CheckoutAttempt::Switched)
            }
            None => Ok(CheckoutAttempt::Rejected(format!("unknown revision {id}"))),
        }
    }

    fn changed_files(&self) -> Result<Vec<String>> {
        let head = self.head.get();
        let current = &self.history[head].1;
        let empty = Tree::new();
        let parent = if head == 0 { &empty } else { &self.history[head - 1].1 };

        let mut paths: Vec<String> = current
            .iter()
            .filter(|(p, bytes)| parent.get(*p) != Some(*bytes))
            .map(|(p, _)| p.clone())
            .collect();
        paths.extend(parent.keys().filter(|p| !current.contains_key(*p)).cloned());
        paths.sort();
        Ok(paths)
    }

    fn head(&self) -> Result<CommitId> {
        Ok(self.history[self.head.get()].0.id.clone())
    }

    fn original_position(&self) -> Result<String> {
        if self.detached.get() {
            return Ok(self.head()?.to_string());
        }
        Ok("main".to_string())
    }

    fn restore(&self, position: &str) -> Result<CheckoutAttempt> {
        self.checkouts.borrow_mut().push(position.to_string());
        if position == "main" {
            self.head.set(self.history.len().saturating_sub(1));
            self.detached.set(false);
            self.materialise();
            return Ok(CheckoutAttempt::Switched);
        }
        match CommitId::parse(position) {
            Some(id) => self.checkout(&id),
            None => Ok(CheckoutAttempt::Rejected(format!("unknown branch {position}"))),
        }
    }
}
