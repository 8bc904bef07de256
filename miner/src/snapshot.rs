//! Declaration snapshots of single file revisions.
//!
//! A [`SourceSnapshot`] flattens one parsed file into a map from
//! [`DeclarationPath`] to declaration. Paths are derived purely from the
//! position of a declaration in the tree, so two independent parses of two
//! revisions of a file can be compared key by key.
//!
//! Path segments:
//! - the declared name of a nested type declaration;
//! - `<clinit>` / `<init>` for static / instance initializer blocks;
//! - `#lambda$N` for a closure found inside a member;
//! - `#inner$N` followed by the name, for an anonymous or local declaration
//!   found inside a member.
//!
//! `N` is the smallest non-negative integer giving a path not yet indexed.

use crate::declaration::{CompilationUnit, NodeId, SyntaxKind};
use crate::parser_registry::ParserRegistry;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::path::Path;

const STATIC_INITIALIZER: &str = "<clinit>";
const INSTANCE_INITIALIZER: &str = "<init>";
const LAMBDA_PREFIX: &str = "#lambda$";
const INNER_PREFIX: &str = "#inner$";

/// Synthetic hierarchical key of a declaration within one file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclarationPath(String);

impl DeclarationPath {
    pub fn root(name: &str) -> Self {
        Self(name.to_string())
    }

    pub fn child(&self, segment: &str) -> Self {
        Self(format!("{}.{}", self.0, segment))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeclarationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeclarationPath {
    fn from(path: &str) -> Self {
        Self(path.to_string())
    }
}

/// A declaration as recorded in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedDeclaration {
    pub kind: SyntaxKind,
    pub fingerprint: String,
}

impl IndexedDeclaration {
    pub fn is_aggregate(&self) -> bool {
        self.kind.is_aggregate()
    }

    /// Exact content comparison, independent of where the nodes came from.
    pub fn structurally_equal(&self, other: &IndexedDeclaration) -> bool {
        self.kind == other.kind && self.fingerprint == other.fingerprint
    }
}

/// Flattened declaration index of one file at one revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSnapshot {
    file_path: String,
    exists: bool,
    declarations: BTreeMap<DeclarationPath, IndexedDeclaration>,
    /// Aggregates anywhere in the parsed unit, keyed or not.
    aggregate_total: usize,
}

impl SourceSnapshot {
    /// The file does not exist at this revision.
    pub fn absent(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            exists: false,
            declarations: BTreeMap::new(),
            aggregate_total: 0,
        }
    }

    /// The file exists but no declarations could be observed.
    pub fn unparsed(file_path: impl Into<String>) -> Self {
        Self {
            exists: true,
            ..Self::absent(file_path)
        }
    }

    /// Index a parsed unit.
    pub fn from_unit(file_path: impl Into<String>, unit: &CompilationUnit) -> Self {
        let declarations = index_unit(unit);
        let aggregate_total = unit.aggregate_count();
        debug_assert!(declarations.values().filter(|d| d.is_aggregate()).count() <= aggregate_total);

        Self {
            file_path: file_path.into(),
            exists: true,
            declarations,
            aggregate_total,
        }
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn declarations(&self) -> &BTreeMap<DeclarationPath, IndexedDeclaration> {
        &self.declarations
    }

    pub fn get(&self, path: &DeclarationPath) -> Option<&IndexedDeclaration> {
        self.declarations.get(path)
    }

    pub fn contains(&self, path: &DeclarationPath) -> bool {
        self.declarations.contains_key(path)
    }

    /// Number of aggregate declarations in the file revision.
    pub fn aggregate_count(&self) -> usize {
        self.aggregate_total
    }

    pub fn paths(&self) -> impl Iterator<Item = &DeclarationPath> {
        self.declarations.keys()
    }
}

/// Builds snapshots from raw file bytes.
pub struct SnapshotIndexer<'a> {
    parsers: &'a ParserRegistry,
}

impl<'a> SnapshotIndexer<'a> {
    pub fn new(parsers: &'a ParserRegistry) -> Self {
        Self { parsers }
    }

    /// Snapshot of `file_path` given its bytes, or `None` when absent.
    ///
    /// A parse failure never fails indexing; it yields an existing file with
    /// no declarations.
    pub fn index(&self, file_path: &str, bytes: Option<&[u8]>) -> SourceSnapshot {
        let Some(bytes) = bytes else {
            return SourceSnapshot::absent(file_path);
        };

        match self.parsers.parse_source(bytes, Path::new(file_path)) {
            Ok(unit) => SourceSnapshot::from_unit(file_path, &unit),
            Err(e) => {
                tracing::warn!("Parse failure for {}: {}", file_path, e);
                SourceSnapshot::unparsed(file_path)
            }
        }
    }
}

/// Worklist expansion of a unit into keyed declarations.
///
/// Every indexed node is scanned exactly once, in insertion order, so newly
/// added paths are scanned in later rounds and never re-numbered.
fn index_unit(unit: &CompilationUnit) -> BTreeMap<DeclarationPath, IndexedDeclaration> {
    let mut index = PathIndex::default();
    let mut worklist: VecDeque<(DeclarationPath, NodeId)> = VecDeque::new();

    for &top in unit.top_level() {
        if let SyntaxKind::Declaration { name, .. } = &unit.node(top).kind {
            let path = index.unique(DeclarationPath::root(name));
            index.insert(unit, path.clone(), top);
            worklist.push_back((path, top));
        }
    }

    while let Some((path, id)) = worklist.pop_front() {
        // Initializer and closure bodies hold statements, not members.
        let type_body = matches!(
            unit.node(id).kind,
            SyntaxKind::Declaration { .. } | SyntaxKind::Anonymous { .. }
        );
        for &member in unit.members(id) {
            match &unit.node(member).kind {
                SyntaxKind::Declaration { name, .. } if type_body => {
                    let child = index.unique(path.child(name));
                    index.insert(unit, child.clone(), member);
                    worklist.push_back((child, member));
                }
                SyntaxKind::Initializer { is_static } if type_body => {
                    let segment = if *is_static {
                        STATIC_INITIALIZER
                    } else {
                        INSTANCE_INITIALIZER
                    };
                    let child = index.unique(path.child(segment));
                    index.insert(unit, child.clone(), member);
                    worklist.push_back((child, member));
                }
                _ => {
                    let mut embedded = Vec::new();
                    collect_embedded(unit, member, &mut embedded);
                    for found in embedded {
                        let child = match &unit.node(found).kind {
                            SyntaxKind::Closure => index.numbered(&path, LAMBDA_PREFIX, ""),
                            SyntaxKind::Declaration { name, .. }
                            | SyntaxKind::Anonymous { name } => {
                                index.numbered(&path, INNER_PREFIX, name)
                            }
                            _ => continue,
                        };
                        index.insert(unit, child.clone(), found);
                        worklist.push_back((child, found));
                    }
                }
            }
        }
    }

    index.entries
}

/// Closures and anonymous/local declarations below `node`, in source order,
/// without looking inside them.
fn collect_embedded(unit: &CompilationUnit, node: NodeId, out: &mut Vec<NodeId>) {
    match unit.node(node).kind {
        SyntaxKind::Other => {
            for &child in unit.members(node) {
                collect_embedded(unit, child, out);
            }
        }
        SyntaxKind::Closure | SyntaxKind::Declaration { .. } | SyntaxKind::Anonymous { .. } => {
            out.push(node)
        }
        // Initializers only exist as direct members of a type body.
        SyntaxKind::Initializer { .. } => {}
    }
}

#[derive(Default)]
struct PathIndex {
    entries: BTreeMap<DeclarationPath, IndexedDeclaration>,
}

impl PathIndex {
    fn insert(&mut self, unit: &CompilationUnit, path: DeclarationPath, node: NodeId) {
        let node = unit.node(node);
        self.entries.insert(
            path,
            IndexedDeclaration {
                kind: node.kind.clone(),
                fingerprint: node.fingerprint.clone(),
            },
        );
    }

    /// `path`, or `path$1`, `path$2`, ... if already taken.
    fn unique(&self, path: DeclarationPath) -> DeclarationPath {
        if !self.entries.contains_key(&path) {
            return path;
        }
        let mut n = 1usize;
        loop {
            let candidate = DeclarationPath(format!("{}${}", path.0, n));
            if !self.entries.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// `parent.<prefix><N><name>` with the smallest free `N`.
    fn numbered(&self, parent: &DeclarationPath, prefix: &str, name: &str) -> DeclarationPath {
        let mut n = 0usize;
        loop {
            let candidate = parent.child(&format!("{prefix}{n}{name}"));
            if !self.entries.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}
