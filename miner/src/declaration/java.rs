//! Java front end built on tree-sitter.

use super::{
    CompilationUnit, CompilationUnitBuilder, DeclarationKind, DeclarationParser, NodeId,
    ParseError, SyntaxKind,
};
use tree_sitter::{Node, Parser};

const COMMENT_KINDS: [&str; 3] = ["line_comment", "block_comment", "comment"];

/// Parses Java sources into declaration trees.
#[derive(Debug, Default, Clone, Copy)]
pub struct JavaParser;

impl JavaParser {
    pub fn new() -> Self {
        Self
    }
}

impl DeclarationParser for JavaParser {
    fn file_extensions(&self) -> &[&'static str] {
        &["java"]
    }

    fn parse(&self, source: &[u8]) -> Result<CompilationUnit, ParseError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_java::language())
            .map_err(|e| ParseError::Language(e.to_string()))?;

        let tree = parser.parse(source, None).ok_or(ParseError::Syntax)?;
        let root = tree.root_node();
        if root.has_error() {
            return Err(ParseError::Syntax);
        }

        let mut lowering = Lowering {
            source,
            builder: CompilationUnit::builder(),
        };
        for child in named_children(root) {
            if declaration_kind(child.kind()).is_some() {
                lowering.declaration(child, None);
            }
        }
        Ok(lowering.builder.build())
    }
}

/// Lowers a tree-sitter syntax tree into the declaration arena.
struct Lowering<'s> {
    source: &'s [u8],
    builder: CompilationUnitBuilder,
}

impl<'s> Lowering<'s> {
    fn declaration(&mut self, node: Node<'_>, parent: Option<NodeId>) -> NodeId {
        let kind = declaration_kind(node.kind()).unwrap_or(DeclarationKind::Class);
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n))
            .unwrap_or_default();
        let fingerprint = self.fingerprint(node);
        let id = self
            .builder
            .add(parent, SyntaxKind::Declaration { name, kind }, fingerprint);

        if let Some(body) = node.child_by_field_name("body") {
            self.class_body(body, id);
        }
        id
    }

    /// Members of a class, interface, enum, record or annotation body.
    fn class_body(&mut self, body: Node<'_>, owner: NodeId) {
        for member in named_children(body) {
            match member.kind() {
                k if COMMENT_KINDS.contains(&k) => {}
                k if declaration_kind(k).is_some() => {
                    self.declaration(member, Some(owner));
                }
                "static_initializer" => self.initializer(member, owner, true),
                "block" => self.initializer(member, owner, false),
                "enum_body_declarations" => self.class_body(member, owner),
                "enum_constant" => self.enum_constant(member, owner),
                _ => {
                    let other = self.builder.add(Some(owner), SyntaxKind::Other, "");
                    self.search(member, other);
                }
            }
        }
    }

    fn initializer(&mut self, node: Node<'_>, owner: NodeId, is_static: bool) {
        let fingerprint = self.fingerprint(node);
        let id = self
            .builder
            .add(Some(owner), SyntaxKind::Initializer { is_static }, fingerprint);

        let block = if node.kind() == "block" {
            Some(node)
        } else {
            named_children(node).into_iter().find(|c| c.kind() == "block")
        };
        if let Some(block) = block {
            self.statements(block, id);
        }
    }

    /// Constant of an enum; a constant with a body is an anonymous subclass.
    fn enum_constant(&mut self, node: Node<'_>, owner: NodeId) {
        let other = self.builder.add(Some(owner), SyntaxKind::Other, "");
        for child in named_children(node) {
            if child.kind() == "class_body" {
                let name = node
                    .child_by_field_name("name")
                    .map(|n| self.text(n))
                    .unwrap_or_default();
                self.anonymous(name, child, other);
            } else {
                self.search(child, other);
            }
        }
    }

    fn anonymous(&mut self, name: String, body: Node<'_>, holder: NodeId) {
        let fingerprint = self.fingerprint(body);
        let id = self
            .builder
            .add(Some(holder), SyntaxKind::Anonymous { name }, fingerprint);
        self.class_body(body, id);
    }

    fn closure(&mut self, node: Node<'_>, holder: NodeId) {
        let fingerprint = self.fingerprint(node);
        let id = self.builder.add(Some(holder), SyntaxKind::Closure, fingerprint);

        match node.child_by_field_name("body") {
            Some(body) if body.kind() == "block" => self.statements(body, id),
            Some(body) => self.statement(body, id),
            None => {}
        }
    }

    /// Statements of a block that is itself a scan target.
    fn statements(&mut self, block: Node<'_>, owner: NodeId) {
        for statement in named_children(block) {
            self.statement(statement, owner);
        }
    }

    fn statement(&mut self, node: Node<'_>, owner: NodeId) {
        match node.kind() {
            k if COMMENT_KINDS.contains(&k) => {}
            k if declaration_kind(k).is_some() => {
                self.declaration(node, Some(owner));
            }
            _ => {
                let other = self.builder.add(Some(owner), SyntaxKind::Other, "");
                self.search(node, other);
            }
        }
    }

    /// Find closures and anonymous/local declarations below `node`, without
    /// descending into them.
    fn search(&mut self, node: Node<'_>, holder: NodeId) {
        match node.kind() {
            k if COMMENT_KINDS.contains(&k) => {}
            k if declaration_kind(k).is_some() => {
                self.declaration(node, Some(holder));
            }
            "lambda_expression" => self.closure(node, holder),
            "object_creation_expression" => {
                for child in named_children(node) {
                    if child.kind() == "class_body" {
                        let name = node
                            .child_by_field_name("type")
                            .map(|t| simple_type_name(&self.text(t)))
                            .unwrap_or_default();
                        self.anonymous(name, child, holder);
                    } else {
                        self.search(child, holder);
                    }
                }
            }
            _ => {
                for child in named_children(node) {
                    self.search(child, holder);
                }
            }
        }
    }

    fn text(&self, node: Node<'_>) -> String {
        String::from_utf8_lossy(&self.source[node.byte_range()]).into_owned()
    }

    /// Space-joined leaf tokens below `node`, comments excluded.
    fn fingerprint(&self, node: Node<'_>) -> String {
        let mut tokens: Vec<String> = Vec::new();
        let mut stack = vec![node];

        while let Some(current) = stack.pop() {
            if COMMENT_KINDS.contains(&current.kind()) {
                continue;
            }
            if current.child_count() == 0 {
                // Leaves hold no layout; string fragments keep their spaces.
                let text = self.text(current);
                if !text.is_empty() {
                    tokens.push(text);
                }
                continue;
            }
            let mut cursor = current.walk();
            let children: Vec<Node<'_>> = current.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }

        tokens.join(" ")
    }
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn declaration_kind(kind: &str) -> Option<DeclarationKind> {
    match kind {
        "class_declaration" => Some(DeclarationKind::Class),
        "interface_declaration" => Some(DeclarationKind::Interface),
        "enum_declaration" => Some(DeclarationKind::Enum),
        "annotation_type_declaration" => Some(DeclarationKind::Annotation),
        "record_declaration" => Some(DeclarationKind::Record),
        _ => None,
    }
}

/// `java.util.Comparator<String>` -> `Comparator`
fn simple_type_name(type_text: &str) -> String {
    let without_generics = type_text.split('<').next().unwrap_or(type_text);
    without_generics
        .rsplit('.')
        .next()
        .unwrap_or(without_generics)
        .trim()
        .to_string()
}
