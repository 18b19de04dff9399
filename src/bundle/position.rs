//! Source positions for bundle records.
//!
//! Every record in the bundle tree carries a [`FileContext`] that is filled in
//! once by the decoder and never changed afterwards.

use marked_yaml::{Node, Span};

/// Position of a record's first token in its originating file.
///
/// Both coordinates are 1-indexed. Two contexts always compare equal, so the
/// derived `PartialEq` of any record is structural equality that ignores
/// where the record came from.
#[derive(Debug, Clone, Copy, Eq)]
pub struct FileContext {
    /// Line of the first token (1-indexed).
    pub line: usize,
    /// Column of the first token (1-indexed).
    pub column: usize,
}

impl FileContext {
    /// Create a context at the given position.
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Default for FileContext {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl PartialEq for FileContext {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl std::fmt::Display for FileContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Read the start position of a YAML node.
///
/// A block mapping's own span starts at the first `:`, so mappings are
/// positioned at their first key. Nodes synthesized by the loader may lack a
/// start marker; those map to the beginning of the file.
pub fn attach_position(node: &Node) -> FileContext {
    match node.as_mapping().and_then(|map| map.iter().next()) {
        Some((first_key, _)) => FileContext::from(first_key.span()),
        None => FileContext::from(node.span()),
    }
}

impl From<&Span> for FileContext {
    fn from(span: &Span) -> Self {
        span.start()
            .map(|marker| FileContext::new(marker.line().max(1), marker.column().max(1)))
            .unwrap_or_default()
    }
}
