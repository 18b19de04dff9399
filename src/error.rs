//! Error types for linter operations.
//!
//! This module defines [`LintError`], the error type returned by the linter
//! entry points, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Problems inside a bundle are diagnostics, never `LintError`s
//! - Use `LintError` for failures that stop a run (unreadable files, bad config)
//! - Use `anyhow::Error` (via `LintError::Other`) for unexpected errors

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for linter operations.
#[derive(Debug, Error)]
pub enum LintError {
    /// A bundle or config file could not be read or written.
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Lint configuration file is malformed.
    #[error("Invalid lint config at {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// A bundle could not be decoded where decoding is mandatory (formatting).
    #[error("Failed to parse bundle at {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for linter operations.
pub type Result<T> = std::result::Result<T, LintError>;
