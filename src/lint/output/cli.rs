//! Table output formatter.
//!
//! Renders diagnostics as a fixed-width table sorted by level, then rule id.

use std::io::Write;

use super::table::Table;
use super::LintFormatter;
use crate::lint::runner::sort_diagnostics;
use crate::lint::{LintDiagnostic, Severity};

const HEADERS: &[&str] = &["Rule ID", "Level", "File", "Line", "Message"];

/// Formats lint output as a table for terminals.
#[derive(Debug, Default)]
pub struct CliFormatter;

impl CliFormatter {
    pub fn new() -> Self {
        Self
    }

    fn row(diagnostic: &LintDiagnostic) -> Vec<String> {
        let location = diagnostic.primary_location();
        let file = location
            .and_then(|l| l.file.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let line = location.map(|l| l.line.to_string()).unwrap_or_default();
        vec![
            diagnostic.rule_id.to_string(),
            diagnostic.severity.to_string(),
            file,
            line,
            diagnostic.message.clone(),
        ]
    }
}

impl LintFormatter for CliFormatter {
    fn format<W: Write + ?Sized>(
        &self,
        diagnostics: &[LintDiagnostic],
        writer: &mut W,
    ) -> std::io::Result<()> {
        if diagnostics.is_empty() {
            writeln!(writer, "No issues found")?;
            return Ok(());
        }

        let mut table = Table::new(HEADERS);
        for diagnostic in sort_diagnostics(diagnostics) {
            table.add_row(Self::row(diagnostic));
        }
        write!(writer, "{}", table.render())?;

        let count = |severity: Severity| diagnostics.iter().filter(|d| d.severity == severity).count();
        writeln!(
            writer,
            "Found {} error(s) and {} warning(s)",
            count(Severity::Error),
            count(Severity::Warning)
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lint::{Location, RuleId};

    fn render(diagnostics: &[LintDiagnostic]) -> String {
        let mut output = Vec::new();
        CliFormatter::new().format(diagnostics, &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn empty_report() {
        assert_eq!(render(&[]), "No issues found\n");
    }

    #[test]
    fn rows_sorted_by_level_then_rule() {
        let diagnostics = vec![
            LintDiagnostic::new(RuleId::new("query-unassigned"), Severity::Warning, "unused")
                .with_location(Location::new("/work/b.mql.yaml", 9, 5)),
            LintDiagnostic::new(RuleId::new("query-name"), Severity::Error, "untitled")
                .with_location(Location::new("/work/b.mql.yaml", 9, 5)),
            LintDiagnostic::new(RuleId::new("policy-name"), Severity::Error, "unnamed")
                .with_location(Location::new("/work/a.mql.yaml", 2, 5)),
        ];
        let output = render(&diagnostics);
        let rule_rows: Vec<&str> = output
            .lines()
            .filter(|line| line.starts_with("│ ") && !line.starts_with("│ Rule ID"))
            .collect();
        assert_eq!(rule_rows.len(), 3);
        assert!(rule_rows[0].contains("policy-name"));
        assert!(rule_rows[1].contains("query-name"));
        assert!(rule_rows[2].contains("query-unassigned"));
        assert!(output.ends_with("Found 2 error(s) and 1 warning(s)\n"));
    }

    #[test]
    fn file_column_shows_basename() {
        let diagnostics = vec![LintDiagnostic::new(
            RuleId::new("policy-uid"),
            Severity::Error,
            "Policy has no uid",
        )
        .with_location(Location::new("/deep/nested/dir/bundle.mql.yaml", 3, 5))];
        let output = render(&diagnostics);
        assert!(output.contains("│ bundle.mql.yaml │"));
        assert!(!output.contains("/deep/nested"));
    }
}
