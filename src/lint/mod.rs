//! Policy bundle linting.
//!
//! This module checks parsed bundles through a pluggable rule-based system.
//!
//! # Overview
//!
//! The lint system consists of:
//!
//! - **Rules** - Individual checks over one kind of bundle item ([`LintRule`] trait)
//! - **Registry** - Collection of all available rules ([`RuleRegistry`])
//! - **Context** - Per-file indexes shared by every rule ([`LintContext`])
//! - **Runner** - Parses files, runs the compiler gate and dispatches rules ([`lint`])
//! - **Diagnostics** - Issue reports with severity and locations ([`LintDiagnostic`])
//!
//! # Example
//!
//! ```
//! use cnspec_lint::lint::{RuleRegistry, RuleId, Severity};
//!
//! let registry = RuleRegistry::builtin();
//! assert!(registry.get(&RuleId::new("policy-uid")).is_some());
//! assert!(registry.get(&RuleId::new("nonexistent")).is_none());
//!
//! // Most severe first
//! assert!(Severity::Error < Severity::Warning);
//! assert!(Severity::Warning < Severity::Note);
//! ```

pub mod context;
pub mod diagnostic;
pub mod location;
pub mod output;
pub mod registry;
pub mod rule;
pub mod rules;
pub mod runner;

pub use context::LintContext;
pub use diagnostic::LintDiagnostic;
pub use location::Location;
pub use output::{CliFormatter, LintFormatter, OutputFormat, SarifFormatter};
pub use registry::RuleRegistry;
pub use rule::{LintItem, LintRule, QueryLintInput, RuleId, RuleTarget, Severity};
pub use runner::{
    lint, lint_with_registry, sort_diagnostics, LintOptions, LintResults, LintStatus,
};
