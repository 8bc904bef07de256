//! Declaration trees produced by language front ends.
//!
//! A front end lowers source text into a [`CompilationUnit`]: an arena of
//! [`SyntaxNode`]s referenced by [`NodeId`]. Only the shapes the snapshot
//! indexer cares about are kept distinct (type declarations, anonymous class
//! bodies, initializer blocks and closures); everything else collapses into
//! [`SyntaxKind::Other`] nodes whose children are the interesting nodes found
//! beneath them, in source order.

pub mod java;

use std::path::{Path, PathBuf};
use thiserror::Error;

pub use java::JavaParser;

/// Index of a node inside its [`CompilationUnit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Kind tag of a named type declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    Class,
    Interface,
    Enum,
    Annotation,
    /// Compact data aggregate (`record`).
    Record,
}

impl DeclarationKind {
    /// Whether this is the aggregate kind whose history is mined.
    pub fn is_aggregate(self) -> bool {
        matches!(self, DeclarationKind::Record)
    }
}

/// Shape of a syntax node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxKind {
    /// Named type declaration (top-level, member or local).
    Declaration { name: String, kind: DeclarationKind },
    /// Anonymous class body, named after the type it instantiates.
    Anonymous { name: String },
    /// Static (`<clinit>`) or instance (`<init>`) initializer block.
    Initializer { is_static: bool },
    /// Lambda body.
    Closure,
    /// Fields, methods, statements, expressions.
    Other,
}

impl SyntaxKind {
    /// Declaration kind, when this node is a named type declaration.
    pub fn declaration_kind(&self) -> Option<DeclarationKind> {
        match self {
            SyntaxKind::Declaration { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_aggregate(&self) -> bool {
        self.declaration_kind().is_some_and(DeclarationKind::is_aggregate)
    }
}

/// One node of the arena.
#[derive(Debug, Clone)]
pub struct SyntaxNode {
    pub kind: SyntaxKind,
    /// Direct members, in source order.
    pub children: Vec<NodeId>,
    /// Normalised token stream (comments and layout dropped) used for
    /// structural equality. Empty for [`SyntaxKind::Other`] nodes.
    pub fingerprint: String,
}

/// A parsed source file.
#[derive(Debug, Clone, Default)]
pub struct CompilationUnit {
    nodes: Vec<SyntaxNode>,
    top_level: Vec<NodeId>,
}

impl CompilationUnit {
    pub fn builder() -> CompilationUnitBuilder {
        CompilationUnitBuilder::default()
    }

    /// Top-level declarations, in source order.
    pub fn top_level(&self) -> &[NodeId] {
        &self.top_level
    }

    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.0]
    }

    pub fn members(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of aggregate declarations anywhere in the unit.
    pub fn aggregate_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.kind.is_aggregate()).count()
    }

    /// Structural equality of `a` in this unit and `b` in `other`.
    pub fn structurally_equal(&self, a: NodeId, other: &CompilationUnit, b: NodeId) -> bool {
        let (left, right) = (self.node(a), other.node(b));
        left.kind == right.kind && left.fingerprint == right.fingerprint
    }
}

/// Incremental construction of a [`CompilationUnit`].
///
/// Nodes are always attached to an already existing parent (or the top
/// level), so the result is a tree.
#[derive(Debug, Default)]
pub struct CompilationUnitBuilder {
    nodes: Vec<SyntaxNode>,
    top_level: Vec<NodeId>,
}

impl CompilationUnitBuilder {
    /// Add a node under `parent`, or at the top level when `parent` is `None`.
    pub fn add(
        &mut self,
        parent: Option<NodeId>,
        kind: SyntaxKind,
        fingerprint: impl Into<String>,
    ) -> NodeId {
        let id = self.add_detached(kind, fingerprint);
        match parent {
            Some(parent) => self.nodes[parent.0].children.push(id),
            None => self.top_level.push(id),
        }
        id
    }

    /// Add a node no scan reaches (it still counts towards aggregate totals).
    pub fn add_detached(&mut self, kind: SyntaxKind, fingerprint: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(SyntaxNode {
            kind,
            children: Vec::new(),
            fingerprint: fingerprint.into(),
        });
        id
    }

    pub fn declaration(
        &mut self,
        parent: Option<NodeId>,
        name: &str,
        kind: DeclarationKind,
        fingerprint: impl Into<String>,
    ) -> NodeId {
        self.add(
            parent,
            SyntaxKind::Declaration {
                name: name.to_string(),
                kind,
            },
            fingerprint,
        )
    }

    pub fn build(self) -> CompilationUnit {
        CompilationUnit {
            nodes: self.nodes,
            top_level: self.top_level,
        }
    }
}

/// Errors reported by a front end.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The source contains syntax errors (the front end's ERROR unit).
    #[error("Source contains syntax errors")]
    Syntax,

    #[error("Failed to load grammar: {0}")]
    Language(String),

    #[error("Unsupported file type: {0}")]
    Unsupported(PathBuf),
}

/// A language front end producing declaration trees.
pub trait DeclarationParser: Send + Sync {
    /// File extensions handled, without the leading dot.
    fn file_extensions(&self) -> &[&'static str];

    fn can_parse(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.file_extensions().contains(&ext))
    }

    /// Parse one file revision.
    fn parse(&self, source: &[u8]) -> Result<CompilationUnit, ParseError>;
}
