//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::lint::OutputFormat;

/// cnspec-lint - Lint and format policy bundles.
#[derive(Debug, Parser)]
#[command(name = "cnspec-lint")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check policy bundles for problems
    Lint(LintArgs),

    /// Rewrite policy bundles in canonical form
    Fmt(FmtArgs),
}

/// Arguments for the `lint` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct LintArgs {
    /// Bundle files to lint
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Write the report as SARIF
    #[arg(long, conflicts_with = "cli")]
    pub sarif: bool,

    /// Write the report as a table (default)
    #[arg(long)]
    pub cli: bool,

    /// Directory SARIF locations are relative to
    #[arg(long)]
    pub root_dir: Option<PathBuf>,

    /// Lint configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl LintArgs {
    /// The report format selected by the flags.
    pub fn format(&self) -> OutputFormat {
        if self.sarif {
            OutputFormat::Sarif
        } else {
            OutputFormat::Cli
        }
    }
}

/// Arguments for the `fmt` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct FmtArgs {
    /// Bundle files to format in place
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}
