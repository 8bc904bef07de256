//! Parser Registry - Manages the language front ends implementing `DeclarationParser`.

use crate::declaration::{CompilationUnit, DeclarationParser, JavaParser, ParseError};
use std::path::Path;
use std::sync::Arc;

/// Registry of all available declaration front ends.
pub struct ParserRegistry {
    java: Arc<JavaParser>,
}

impl ParserRegistry {
    /// Create a new parser registry.
    pub fn new() -> Self {
        Self {
            java: Arc::new(JavaParser::new()),
        }
    }

    fn parsers(&self) -> [Arc<dyn DeclarationParser>; 1] {
        [self.java.clone()]
    }

    /// Find appropriate parser for a file path.
    pub fn parser_for_path(&self, path: &Path) -> Option<Arc<dyn DeclarationParser>> {
        self.parsers().into_iter().find(|p| p.can_parse(path))
    }

    /// Check if a file path is supported by any parser.
    pub fn can_parse(&self, path: &Path) -> bool {
        self.parser_for_path(path).is_some()
    }

    /// Parse one file revision using the parser for `path`.
    pub fn parse_source(&self, source: &[u8], path: &Path) -> Result<CompilationUnit, ParseError> {
        let parser = self
            .parser_for_path(path)
            .ok_or_else(|| ParseError::Unsupported(path.to_path_buf()))?;

        parser.parse(source)
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}
