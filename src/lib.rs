//! cnspec-lint - Static checks for cnspec policy bundles.
//!
//! A policy bundle is a YAML file declaring policies, queries and
//! migration groups. This crate parses bundles with source positions,
//! runs a registry of lint rules over them, gates the combined bundle
//! through a compiler, and renders the findings as a terminal table or a
//! SARIF log. It can also rewrite bundles in canonical form.
//!
//! # Modules
//!
//! - [`bundle`] - Bundle schema, positional parsing, compilation and formatting
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Lint configuration (required tags, disabled rules)
//! - [`error`] - Error types and result aliases
//! - [`lint`] - Rules, registry, runner and report formatters
//!
//! # Example
//!
//! ```
//! use cnspec_lint::bundle::parse_str;
//!
//! let bundle = parse_str("queries:\n  - uid: sshd-config\n    mql: sshd.config.params\n").unwrap();
//! assert_eq!(bundle.queries[0].uid, "sshd-config");
//! assert_eq!(bundle.queries[0].file_context.line, 2);
//! ```
//!
//! For linting files on disk, see [`lint::lint`] and the integration tests.

pub mod bundle;
pub mod cli;
pub mod config;
pub mod error;
pub mod lint;

pub use error::{LintError, Result};
