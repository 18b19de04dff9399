//! The lint pipeline.
//!
//! For every input file the runner parses the bundle, builds a
//! [`LintContext`] and dispatches the registered rules. Once every file has
//! been linted the union of all parsed bundles goes through the compiler
//! gate.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::context::LintContext;
use super::diagnostic::LintDiagnostic;
use super::location::Location;
use super::registry::RuleRegistry;
use super::rule::{LintItem, LintRule, QueryLintInput, Severity};
use super::rules::{BUNDLE_COMPILE_ERROR, BUNDLE_INVALID, BUNDLE_UNKNOWN_FIELD};
use crate::bundle::{parse, Bundle, BundleCompiler, DecodeError, DecodeErrorKind, MqlCompiler};
use crate::config::LintConfig;
use crate::error::{LintError, Result};

/// Settings for one lint run.
pub struct LintOptions {
    pub config: LintConfig,
    pub compiler: Box<dyn MqlCompiler>,
    /// Checked before each file and before the compiler gate.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for LintOptions {
    fn default() -> Self {
        Self {
            config: LintConfig::default(),
            compiler: Box::new(BundleCompiler),
            cancel: None,
        }
    }
}

impl LintOptions {
    pub fn with_config(config: LintConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Whether a run finished or stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintStatus {
    Complete,
    Cancelled,
}

/// Outcome of a lint run.
#[derive(Debug, Clone)]
pub struct LintResults {
    /// Diagnostics in discovery order.
    pub entries: Vec<LintDiagnostic>,
    pub status: LintStatus,
}

impl LintResults {
    /// Whether any error-level diagnostic was produced.
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|e| e.severity == Severity::Error)
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == LintStatus::Cancelled
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries.iter().filter(|e| e.severity == severity).count()
    }

    /// Diagnostics ordered by severity, then rule id; ties keep discovery order.
    pub fn sorted(&self) -> Vec<&LintDiagnostic> {
        sort_diagnostics(&self.entries)
    }
}

/// Stable sort by `(severity, rule id)`.
pub fn sort_diagnostics(entries: &[LintDiagnostic]) -> Vec<&LintDiagnostic> {
    let mut sorted: Vec<&LintDiagnostic> = entries.iter().collect();
    sorted.sort_by(|a, b| (a.severity, &a.rule_id).cmp(&(b.severity, &b.rule_id)));
    sorted
}

/// Lint files with the built-in rules.
pub fn lint<P: AsRef<Path>>(files: &[P], options: &LintOptions) -> Result<LintResults> {
    lint_with_registry(files, options, RuleRegistry::builtin())
}

/// Lint files with a custom rule set.
///
/// Files listed more than once are linted once. Any file that cannot be
/// read aborts the run before a single rule runs.
pub fn lint_with_registry<P: AsRef<Path>>(
    files: &[P],
    options: &LintOptions,
    registry: &RuleRegistry,
) -> Result<LintResults> {
    let sources = read_sources(files)?;
    let rules: Vec<&dyn LintRule> = registry.iter().collect();

    let mut entries = Vec::new();
    let mut bundles: Vec<Bundle> = Vec::with_capacity(sources.len());
    let mut all_parsed = true;

    for (path, bytes) in &sources {
        if options.is_cancelled() {
            info!(file = %path.display(), "Lint cancelled");
            return Ok(finish(entries, LintStatus::Cancelled, &options.config));
        }

        let bundle = match parse(bytes) {
            Ok(bundle) => bundle,
            Err(error) => {
                warn!(file = %path.display(), error = %error, "Skipping unparsable bundle");
                entries.push(decode_diagnostic(path, &error));
                all_parsed = false;
                continue;
            }
        };

        let ctx = LintContext::build(path, &bundle, &options.config);
        let diagnostics = dispatch(&rules, &ctx);
        debug!(file = %path.display(), entries = diagnostics.len(), "Linted bundle");
        entries.extend(diagnostics);
        bundles.push(bundle);
    }

    if options.is_cancelled() {
        info!("Lint cancelled before compilation");
        return Ok(finish(entries, LintStatus::Cancelled, &options.config));
    }

    if all_parsed && !sources.is_empty() {
        let union = Bundle::union(&bundles);
        match options.compiler.compile(&union) {
            Ok(()) => debug!(files = sources.len(), "Bundle compiled"),
            Err(error) => {
                debug!(error = %error, "Bundle failed to compile");
                let diagnostic = sources.iter().fold(
                    LintDiagnostic::for_rule(&BUNDLE_COMPILE_ERROR, error.message),
                    |diagnostic, (path, _)| diagnostic.with_location(Location::file_start(path)),
                );
                entries.push(diagnostic);
            }
        }
    }

    Ok(finish(entries, LintStatus::Complete, &options.config))
}

/// Run every rule matching each item of a file, in dispatch order:
/// policies, global queries, embedded queries, the bundle, migration groups.
pub(crate) fn dispatch(rules: &[&dyn LintRule], ctx: &LintContext<'_>) -> Vec<LintDiagnostic> {
    let bundle = ctx.bundle;
    let mut out = Vec::new();

    for policy in &bundle.policies {
        apply(rules, ctx, LintItem::Policy(policy), &mut out);
    }
    for query in &bundle.queries {
        let input = QueryLintInput {
            query,
            is_global: true,
            is_variant: ctx.is_variant_uid(&query.uid),
        };
        apply(rules, ctx, LintItem::Query(input), &mut out);
    }
    for input in &ctx.embedded_queries {
        apply(rules, ctx, LintItem::Query(*input), &mut out);
    }
    apply(rules, ctx, LintItem::Bundle(bundle), &mut out);
    for group in &bundle.migration_groups {
        apply(rules, ctx, LintItem::MigrationGroup(group), &mut out);
    }
    out
}

fn apply(
    rules: &[&dyn LintRule],
    ctx: &LintContext<'_>,
    item: LintItem<'_>,
    out: &mut Vec<LintDiagnostic>,
) {
    for rule in rules.iter().filter(|rule| rule.target() == item.target()) {
        out.extend(rule.check(ctx, &item));
    }
}

/// Resolve and read every input once, keyed by absolute path.
fn read_sources<P: AsRef<Path>>(files: &[P]) -> Result<Vec<(PathBuf, Vec<u8>)>> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();
    for file in files {
        let file = file.as_ref();
        let path = fs::canonicalize(file).map_err(|source| LintError::Io {
            path: file.to_path_buf(),
            source,
        })?;
        if !seen.insert(path.clone()) {
            debug!(file = %path.display(), "Skipping duplicate input");
            continue;
        }
        let bytes = fs::read(&path).map_err(|source| LintError::Io {
            path: path.clone(),
            source,
        })?;
        sources.push((path, bytes));
    }
    Ok(sources)
}

fn decode_diagnostic(path: &Path, error: &DecodeError) -> LintDiagnostic {
    let rule = match error.kind {
        DecodeErrorKind::UnknownField => &BUNDLE_UNKNOWN_FIELD,
        DecodeErrorKind::Syntax | DecodeErrorKind::Invalid => &BUNDLE_INVALID,
    };
    LintDiagnostic::for_rule(rule, error.message.clone())
        .with_location(Location::at(path, &error.position))
}

fn finish(entries: Vec<LintDiagnostic>, status: LintStatus, config: &LintConfig) -> LintResults {
    let entries = entries
        .into_iter()
        .filter(|entry| !config.is_disabled(entry.rule_id.as_str()))
        .collect();
    LintResults { entries, status }
}
