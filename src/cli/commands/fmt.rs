//! Fmt command implementation.
//!
//! The `cnspec-lint fmt` command rewrites bundle files in canonical form.

use std::io::Write;

use anyhow::Context;
use tracing::info;

use crate::bundle::format_file;
use crate::cli::args::FmtArgs;
use crate::error::Result;

use super::dispatcher::{Command, CommandResult};

/// The fmt command implementation.
pub struct FmtCommand {
    args: FmtArgs,
}

impl FmtCommand {
    /// Create a new fmt command.
    pub fn new(args: FmtArgs) -> Self {
        Self { args }
    }

    /// Get the command arguments.
    pub fn args(&self) -> &FmtArgs {
        &self.args
    }
}

impl Command for FmtCommand {
    fn execute(&self, out: &mut dyn Write) -> Result<CommandResult> {
        for file in &self.args.files {
            if format_file(file)? {
                info!(file = %file.display(), "Formatted bundle");
                writeln!(out, "formatted {}", file.display())
                    .context("Failed to write fmt output")?;
            }
        }
        Ok(CommandResult::success())
    }
}
