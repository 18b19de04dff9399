//! Lint command implementation.
//!
//! The `cnspec-lint lint` command checks bundle files with the built-in rules
//! and writes a table or SARIF report.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::cli::args::LintArgs;
use crate::config::LintConfig;
use crate::error::Result;
use crate::lint::{
    lint, CliFormatter, LintFormatter, LintOptions, LintResults, OutputFormat, RuleRegistry,
    SarifFormatter,
};

use super::dispatcher::{Command, CommandResult};

/// The lint command implementation.
pub struct LintCommand {
    args: LintArgs,
}

impl LintCommand {
    /// Create a new lint command.
    pub fn new(args: LintArgs) -> Self {
        Self { args }
    }

    /// Get the command arguments.
    pub fn args(&self) -> &LintArgs {
        &self.args
    }

    fn options(&self) -> Result<LintOptions> {
        let config = match &self.args.config {
            Some(path) => LintConfig::load(path)?,
            None => LintConfig::default(),
        };
        Ok(LintOptions::with_config(config))
    }

    /// Directory SARIF artifact URIs are made relative to.
    ///
    /// Linted files are canonicalized, so the root is too when it exists.
    fn root_dir(&self) -> Result<PathBuf> {
        let root = match &self.args.root_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };
        Ok(canonical_or_given(&root))
    }

    fn write_report(&self, results: &LintResults, out: &mut dyn Write) -> Result<()> {
        let written = match self.args.format() {
            OutputFormat::Cli => CliFormatter::new().format(&results.entries, out),
            OutputFormat::Sarif => SarifFormatter::new(RuleRegistry::builtin())
                .with_root_dir(self.root_dir()?)
                .format(&results.entries, out),
        };
        written.context("Failed to write lint report")?;
        Ok(())
    }
}

fn canonical_or_given(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

impl Command for LintCommand {
    fn execute(&self, out: &mut dyn Write) -> Result<CommandResult> {
        let options = self.options()?;
        let results = lint(&self.args.files, &options)?;
        debug!(
            files = self.args.files.len(),
            entries = results.entries.len(),
            "Lint finished"
        );

        self.write_report(&results, out)?;

        if results.has_errors() {
            Ok(CommandResult::failure(1))
        } else {
            Ok(CommandResult::success())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const CLEAN: &str = "\
policies:
  - uid: clean-policy
    name: Clean policy
    version: 1.0.0
    tags:
      mondoo.com/category: security
      mondoo.com/platform: linux
    require:
      - provider: os
    groups:
      - filters: asset.family.contains('unix')
        checks:
          - uid: clean-check
queries:
  - uid: clean-check
    title: Clean check
    mql: users.all(name != 'root')
";

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn run(args: LintArgs) -> (CommandResult, String) {
        let mut out = Vec::new();
        let result = LintCommand::new(args).execute(&mut out).unwrap();
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn clean_bundle_succeeds() {
        let temp = TempDir::new().unwrap();
        let file = write(&temp, "clean.mql.yaml", CLEAN);

        let (result, output) = run(LintArgs {
            files: vec![file],
            ..Default::default()
        });

        assert!(result.success);
        assert_eq!(output, "No issues found\n");
    }

    #[test]
    fn errors_fail_with_exit_code_one() {
        let temp = TempDir::new().unwrap();
        let file = write(&temp, "broken.mql.yaml", "policies:\n  - name: No uid\n");

        let (result, output) = run(LintArgs {
            files: vec![file],
            ..Default::default()
        });

        assert_eq!(result.exit_code, 1);
        assert!(output.contains("policy-uid"));
    }

    #[test]
    fn sarif_report_uses_root_dir() {
        let temp = TempDir::new().unwrap();
        let file = write(&temp, "broken.mql.yaml", "policies:\n  - name: No uid\n");

        let (_, output) = run(LintArgs {
            files: vec![file],
            sarif: true,
            root_dir: Some(temp.path().to_path_buf()),
            ..Default::default()
        });

        let sarif: serde_json::Value = serde_json::from_str(&output).unwrap();
        let artifact =
            &sarif["runs"][0]["results"][0]["locations"][0]["physicalLocation"]["artifactLocation"];
        assert_eq!(artifact["uri"], "broken.mql.yaml");
        assert_eq!(artifact["uriBaseId"], "%SRCROOT%");
    }

    #[test]
    fn disabled_rules_are_dropped() {
        let temp = TempDir::new().unwrap();
        let bundle = CLEAN.replace("    version: 1.0.0\n", "");
        let file = write(&temp, "noversion.mql.yaml", &bundle);
        let config = write(&temp, "lint.yaml", "disabled_rules:\n  - policy-missing-version\n");

        let (result, output) = run(LintArgs {
            files: vec![file],
            config: Some(config),
            ..Default::default()
        });

        assert!(result.success);
        assert_eq!(output, "No issues found\n");
    }

    #[test]
    fn missing_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let mut out = Vec::new();
        let result = LintCommand::new(LintArgs {
            files: vec![temp.path().join("missing.yaml")],
            ..Default::default()
        })
        .execute(&mut out);

        assert!(result.is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn bad_config_is_an_error() {
        let temp = TempDir::new().unwrap();
        let file = write(&temp, "clean.mql.yaml", CLEAN);
        let config = write(&temp, "lint.yaml", "unknown_key: true\n");

        let mut out = Vec::new();
        let result = LintCommand::new(LintArgs {
            files: vec![file],
            config: Some(config),
            ..Default::default()
        })
        .execute(&mut out);

        assert!(matches!(result, Err(crate::error::LintError::Config { .. })));
    }
}
