//! Lint rule definitions.
//!
//! This module provides the core traits and types for defining lint rules:
//!
//! - [`LintRule`] - The trait that all lint rules must implement
//! - [`RuleId`] - Unique identifier for a lint rule
//! - [`Severity`] - Severity level for diagnostics (Error, Warning, Note, None)
//! - [`LintItem`] - The part of a bundle a rule is applied to

use super::context::LintContext;
use super::diagnostic::LintDiagnostic;
use crate::bundle::{Bundle, MigrationGroup, Mquery, Policy};

/// Unique identifier for a lint rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub String);

impl RuleId {
    /// Create a new rule ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Severity level for lint diagnostics.
///
/// Ordered from most to least severe, which is also the order reports list
/// them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Problem that makes the bundle invalid.
    Error,
    /// Problem that should be addressed.
    Warning,
    /// Informational note.
    Note,
    /// No severity assigned.
    None,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
            Severity::None => "none",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of item a rule is dispatched over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleTarget {
    Bundle,
    Policy,
    Query,
    MigrationGroup,
    /// Reported by the runner itself (parse and compile failures).
    Pipeline,
}

/// A query together with where it was found.
#[derive(Debug, Clone, Copy)]
pub struct QueryLintInput<'a> {
    pub query: &'a Mquery,
    /// Defined in the bundle's top-level `queries` list.
    pub is_global: bool,
    /// Reached through some parent query's `variants`.
    pub is_variant: bool,
}

/// The item handed to [`LintRule::check`].
#[derive(Debug, Clone, Copy)]
pub enum LintItem<'a> {
    Bundle(&'a Bundle),
    Policy(&'a Policy),
    Query(QueryLintInput<'a>),
    MigrationGroup(&'a MigrationGroup),
}

impl LintItem<'_> {
    pub fn target(&self) -> RuleTarget {
        match self {
            LintItem::Bundle(_) => RuleTarget::Bundle,
            LintItem::Policy(_) => RuleTarget::Policy,
            LintItem::Query(_) => RuleTarget::Query,
            LintItem::MigrationGroup(_) => RuleTarget::MigrationGroup,
        }
    }
}

/// A lint rule that validates one kind of bundle item.
///
/// Each rule checks for a specific issue and produces diagnostics
/// when problems are found. The engine only passes items matching
/// [`LintRule::target`].
pub trait LintRule: Send + Sync {
    /// Unique identifier for this rule.
    fn id(&self) -> RuleId;

    /// Human-readable name of the rule.
    fn name(&self) -> &str;

    /// Description of what this rule checks.
    fn description(&self) -> &str;

    /// Default severity for this rule.
    fn default_severity(&self) -> Severity;

    /// Kind of item this rule inspects.
    fn target(&self) -> RuleTarget;

    /// Check an item and return any diagnostics.
    fn check(&self, ctx: &LintContext<'_>, item: &LintItem<'_>) -> Vec<LintDiagnostic>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_id_equality() {
        let id1 = RuleId::new("policy-uid");
        let id2 = RuleId::new("policy-uid");
        let id3 = RuleId::new("query-uid");

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn rule_id_display() {
        let id = RuleId::new("policy-name");
        assert_eq!(format!("{}", id), "policy-name");
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Error < Severity::Warning);
        assert!(Severity::Warning < Severity::Note);
        assert!(Severity::Note < Severity::None);
    }

    #[test]
    fn severity_display() {
        assert_eq!(format!("{}", Severity::Error), "error");
        assert_eq!(format!("{}", Severity::Warning), "warning");
        assert_eq!(format!("{}", Severity::Note), "note");
        assert_eq!(format!("{}", Severity::None), "none");
    }

    #[test]
    fn item_target_matches_variant() {
        let bundle = Bundle::default();
        assert_eq!(LintItem::Bundle(&bundle).target(), RuleTarget::Bundle);
        let query = Mquery::default();
        let input = QueryLintInput {
            query: &query,
            is_global: true,
            is_variant: false,
        };
        assert_eq!(LintItem::Query(input).target(), RuleTarget::Query);
    }
}
