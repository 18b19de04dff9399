//! Lint diagnostic messages.
//!
//! This module provides the [`LintDiagnostic`] type for representing
//! issues found in a bundle, with the source locations they refer to.

use super::location::Location;
use super::rule::{LintRule, RuleId, Severity};

/// A diagnostic message produced by a lint rule or the lint pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintDiagnostic {
    /// The rule that produced this diagnostic.
    pub rule_id: RuleId,
    /// Severity of this diagnostic.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Source locations; the first one is the primary location.
    pub locations: Vec<Location>,
}

impl LintDiagnostic {
    /// Create a new diagnostic.
    pub fn new(rule_id: RuleId, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            rule_id,
            severity,
            message: message.into(),
            locations: vec![],
        }
    }

    /// Create a diagnostic carrying a rule's id and default severity.
    pub fn for_rule(rule: &(impl LintRule + ?Sized), message: impl Into<String>) -> Self {
        Self::new(rule.id(), rule.default_severity(), message)
    }

    /// Add a source location to this diagnostic.
    pub fn with_location(mut self, location: Location) -> Self {
        self.locations.push(location);
        self
    }

    pub fn primary_location(&self) -> Option<&Location> {
        self.locations.first()
    }
}
