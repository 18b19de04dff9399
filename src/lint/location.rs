//! Source locations.
//!
//! A [`Location`] points at the first token of a record in a bundle file.

use std::path::{Path, PathBuf};

use crate::bundle::FileContext;

/// A position inside a bundle file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// File path.
    pub file: PathBuf,
    /// Line (1-indexed).
    pub line: usize,
    /// Column (1-indexed).
    pub column: usize,
}

impl Location {
    /// Create a location with a precise position.
    pub fn new(file: impl Into<PathBuf>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// Location of the start of a file, used for file-level diagnostics.
    pub fn file_start(file: impl Into<PathBuf>) -> Self {
        Self::new(file, 1, 1)
    }

    /// Location of a decoded record.
    pub fn at(file: &Path, context: &FileContext) -> Self {
        Self::new(file, context.line, context.column)
    }
}
