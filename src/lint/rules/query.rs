//! Query validation rules.
//!
//! Most of these rules run once per global query and once per query
//! definition embedded in a policy group. The [`QueryLintInput`] tells them
//! which one they are looking at. Usage conflicts are checked once per file.

use std::collections::HashSet;

use crate::bundle::Mquery;
use crate::lint::context::LintContext;
use crate::lint::rule::QueryLintInput;
use crate::lint::{LintDiagnostic, LintItem, LintRule, RuleId, RuleTarget, Severity};

use super::{invalid_uid_message, is_valid_uid};

fn query_input<'i, 'a>(item: &'i LintItem<'a>) -> Option<&'i QueryLintInput<'a>> {
    match item {
        LintItem::Query(input) => Some(input),
        _ => None,
    }
}

fn query_label(query: &Mquery) -> &str {
    if query.uid.is_empty() {
        "<unnamed>"
    } else {
        &query.uid
    }
}

/// Ensures global queries have a well-formed UID.
pub struct QueryUidRule;

impl LintRule for QueryUidRule {
    fn id(&self) -> RuleId {
        RuleId::new("query-uid")
    }

    fn name(&self) -> &str {
        "Query UID"
    }

    fn description(&self) -> &str {
        "Global queries must have a valid uid"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn target(&self) -> RuleTarget {
        RuleTarget::Query
    }

    fn check(&self, ctx: &LintContext<'_>, item: &LintItem<'_>) -> Vec<LintDiagnostic> {
        let Some(input) = query_input(item).filter(|input| input.is_global) else {
            return vec![];
        };
        let query = input.query;
        let message = if query.uid.is_empty() {
            "Query has no uid".to_string()
        } else if !is_valid_uid(&query.uid) {
            invalid_uid_message("Query", &query.uid)
        } else {
            return vec![];
        };
        vec![LintDiagnostic::for_rule(self, message)
            .with_location(ctx.location(&query.file_context))]
    }
}

/// Detects a global query UID defined more than once in the same file.
pub struct QueryUidUniqueRule;

impl LintRule for QueryUidUniqueRule {
    fn id(&self) -> RuleId {
        RuleId::new("query-uid-unique")
    }

    fn name(&self) -> &str {
        "Unique Query UID"
    }

    fn description(&self) -> &str {
        "Global query uids must be unique within a bundle"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn target(&self) -> RuleTarget {
        RuleTarget::Query
    }

    fn check(&self, ctx: &LintContext<'_>, item: &LintItem<'_>) -> Vec<LintDiagnostic> {
        let Some(input) = query_input(item).filter(|input| input.is_global) else {
            return vec![];
        };
        let query = input.query;
        if query.uid.is_empty() || ctx.is_first_global_query(query) {
            return vec![];
        }
        vec![LintDiagnostic::for_rule(
            self,
            format!("Query uid '{}' is already used in this file", query.uid),
        )
        .with_location(ctx.location(&query.file_context))]
    }
}

/// Requires a title on every query definition that is not a variant.
///
/// Embedded queries that refine a global query inherit its title.
pub struct QueryNameRule;

impl LintRule for QueryNameRule {
    fn id(&self) -> RuleId {
        RuleId::new("query-name")
    }

    fn name(&self) -> &str {
        "Query Title"
    }

    fn description(&self) -> &str {
        "Queries must have a title"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn target(&self) -> RuleTarget {
        RuleTarget::Query
    }

    fn check(&self, ctx: &LintContext<'_>, item: &LintItem<'_>) -> Vec<LintDiagnostic> {
        let Some(input) = query_input(item) else {
            return vec![];
        };
        let query = input.query;
        if input.is_variant || !query.title.is_empty() || !query.is_definition_complete() {
            return vec![];
        }
        if !input.is_global && query.refines_global() {
            return vec![];
        }
        vec![LintDiagnostic::for_rule(
            self,
            format!("Query '{}' has no title", query_label(query)),
        )
        .with_location(ctx.location(&query.file_context))]
    }
}

/// Requires MQL on variants and on queries that do not delegate to variants.
pub struct QueryMissingMqlRule;

impl LintRule for QueryMissingMqlRule {
    fn id(&self) -> RuleId {
        RuleId::new("query-missing-mql")
    }

    fn name(&self) -> &str {
        "Query MQL"
    }

    fn description(&self) -> &str {
        "Queries must have mql unless they are implemented by variants"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn target(&self) -> RuleTarget {
        RuleTarget::Query
    }

    fn check(&self, ctx: &LintContext<'_>, item: &LintItem<'_>) -> Vec<LintDiagnostic> {
        let Some(input) = query_input(item) else {
            return vec![];
        };
        let query = input.query;
        if !query.mql.is_empty() {
            return vec![];
        }
        let message = if input.is_variant {
            format!("Variant '{}' has no mql", query_label(query))
        } else if query.variants.is_empty() {
            if !input.is_global && query.refines_global() {
                return vec![];
            }
            format!("Query '{}' has neither mql nor variants", query_label(query))
        } else {
            return vec![];
        };
        vec![LintDiagnostic::for_rule(self, message)
            .with_location(ctx.location(&query.file_context))]
    }
}

/// Variants may only override the implementation, not presentation fields.
pub struct QueryVariantFieldsRule;

impl LintRule for QueryVariantFieldsRule {
    fn id(&self) -> RuleId {
        RuleId::new("query-variant-uses-non-default-fields")
    }

    fn name(&self) -> &str {
        "Variant Fields"
    }

    fn description(&self) -> &str {
        "Variants must not set impact, title, tags or variants"
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn target(&self) -> RuleTarget {
        RuleTarget::Query
    }

    fn check(&self, ctx: &LintContext<'_>, item: &LintItem<'_>) -> Vec<LintDiagnostic> {
        let Some(input) = query_input(item).filter(|input| input.is_variant) else {
            return vec![];
        };
        let query = input.query;
        let mut fields = Vec::new();
        if query.impact.is_some() {
            fields.push("impact");
        }
        if !query.title.is_empty() {
            fields.push("title");
        }
        if !query.tags.is_empty() {
            fields.push("tags");
        }
        if !query.variants.is_empty() {
            fields.push("variants");
        }
        if fields.is_empty() {
            return vec![];
        }
        vec![LintDiagnostic::for_rule(
            self,
            format!(
                "Variant '{}' sets fields reserved for its parent: {}",
                query_label(query),
                fields.join(", ")
            ),
        )
        .with_location(ctx.location(&query.file_context))]
    }
}

/// Flags global queries that no policy in the file assigns.
pub struct QueryUnassignedRule;

impl LintRule for QueryUnassignedRule {
    fn id(&self) -> RuleId {
        RuleId::new("query-unassigned")
    }

    fn name(&self) -> &str {
        "Unassigned Query"
    }

    fn description(&self) -> &str {
        "Global queries should be assigned by a policy"
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn target(&self) -> RuleTarget {
        RuleTarget::Query
    }

    fn check(&self, ctx: &LintContext<'_>, item: &LintItem<'_>) -> Vec<LintDiagnostic> {
        let Some(input) = query_input(item).filter(|i| i.is_global && !i.is_variant) else {
            return vec![];
        };
        let query = input.query;
        if query.uid.is_empty() || ctx.assigned_query_uids.contains(query.uid.as_str()) {
            return vec![];
        }
        vec![LintDiagnostic::for_rule(
            self,
            format!("Query '{}' is not assigned to any policy", query.uid),
        )
        .with_location(ctx.location(&query.file_context))]
    }
}

/// A query is either a check or a data query, never both.
pub struct QueryUsedAsDifferentTypesRule;

impl LintRule for QueryUsedAsDifferentTypesRule {
    fn id(&self) -> RuleId {
        RuleId::new("query-used-as-different-types")
    }

    fn name(&self) -> &str {
        "Query Usage"
    }

    fn description(&self) -> &str {
        "A query must not be assigned both as a check and as a data query"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn target(&self) -> RuleTarget {
        RuleTarget::Bundle
    }

    /// Reported once per UID, at its global definition when there is one and
    /// otherwise at the first group that assigns it.
    fn check(&self, ctx: &LintContext<'_>, item: &LintItem<'_>) -> Vec<LintDiagnostic> {
        let LintItem::Bundle(_) = item else {
            return vec![];
        };
        let mut reported = HashSet::new();
        let mut diagnostics = Vec::new();
        for site in &ctx.assignment_sites {
            let uid = site.uid.as_str();
            if uid.is_empty()
                || !ctx.query_usage_as_check.contains(uid)
                || !ctx.query_usage_as_data.contains(uid)
                || !reported.insert(uid)
            {
                continue;
            }
            let anchor = ctx
                .global_queries_by_uid
                .get(uid)
                .map_or(&site.file_context, |global| &global.file_context);
            diagnostics.push(
                LintDiagnostic::for_rule(
                    self,
                    format!("Query '{uid}' is assigned both as a check and as a data query"),
                )
                .with_location(ctx.location(anchor)),
            );
        }
        diagnostics
    }
}
