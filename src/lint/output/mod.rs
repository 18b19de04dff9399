//! Lint output formatters.
//!
//! This module provides formatters for outputting lint diagnostics
//! as a terminal table or as a SARIF log.

pub mod cli;
pub mod sarif;
pub mod table;

use crate::lint::LintDiagnostic;
use std::io::Write;

/// Output format for lint results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Cli,
    Sarif,
}

/// Trait for formatting lint output.
pub trait LintFormatter {
    /// Format diagnostics to the given writer.
    fn format<W: Write + ?Sized>(
        &self,
        diagnostics: &[LintDiagnostic],
        writer: &mut W,
    ) -> std::io::Result<()>;
}

pub use cli::CliFormatter;
pub use sarif::SarifFormatter;
pub use table::Table;
