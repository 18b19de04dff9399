//! Policy validation rules.
//!
//! These rules run once per policy in a bundle file.

use crate::bundle::{Mquery, Policy};
use crate::lint::context::LintContext;
use crate::lint::{LintDiagnostic, LintItem, LintRule, RuleId, RuleTarget, Severity};

use super::{invalid_uid_message, is_semver, is_valid_uid};

fn policy_label(policy: &Policy) -> &str {
    if policy.uid.is_empty() {
        "<unnamed>"
    } else {
        &policy.uid
    }
}

/// Ensures every policy has a well-formed UID.
pub struct PolicyUidRule;

impl LintRule for PolicyUidRule {
    fn id(&self) -> RuleId {
        RuleId::new("policy-uid")
    }

    fn name(&self) -> &str {
        "Policy UID"
    }

    fn description(&self) -> &str {
        "Policies must have a valid uid"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn target(&self) -> RuleTarget {
        RuleTarget::Policy
    }

    fn check(&self, ctx: &LintContext<'_>, item: &LintItem<'_>) -> Vec<LintDiagnostic> {
        let LintItem::Policy(policy) = item else {
            return vec![];
        };
        let message = if policy.uid.is_empty() {
            "Policy has no uid".to_string()
        } else if !is_valid_uid(&policy.uid) {
            invalid_uid_message("Policy", &policy.uid)
        } else {
            return vec![];
        };
        vec![LintDiagnostic::for_rule(self, message)
            .with_location(ctx.location(&policy.file_context))]
    }
}

/// Detects a policy UID defined more than once in the same file.
pub struct PolicyUidUniqueRule;

impl LintRule for PolicyUidUniqueRule {
    fn id(&self) -> RuleId {
        RuleId::new("policy-uid-unique")
    }

    fn name(&self) -> &str {
        "Unique Policy UID"
    }

    fn description(&self) -> &str {
        "Policy uids must be unique within a bundle"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn target(&self) -> RuleTarget {
        RuleTarget::Policy
    }

    fn check(&self, ctx: &LintContext<'_>, item: &LintItem<'_>) -> Vec<LintDiagnostic> {
        let LintItem::Policy(policy) = item else {
            return vec![];
        };
        if policy.uid.is_empty() || ctx.is_first_policy(policy) {
            return vec![];
        }
        vec![LintDiagnostic::for_rule(
            self,
            format!("Policy uid '{}' is already used in this file", policy.uid),
        )
        .with_location(ctx.location(&policy.file_context))]
    }
}

pub struct PolicyNameRule;

impl LintRule for PolicyNameRule {
    fn id(&self) -> RuleId {
        RuleId::new("policy-name")
    }

    fn name(&self) -> &str {
        "Policy Name"
    }

    fn description(&self) -> &str {
        "Policies must have a name"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn target(&self) -> RuleTarget {
        RuleTarget::Policy
    }

    fn check(&self, ctx: &LintContext<'_>, item: &LintItem<'_>) -> Vec<LintDiagnostic> {
        let LintItem::Policy(policy) = item else {
            return vec![];
        };
        if !policy.name.is_empty() {
            return vec![];
        }
        vec![LintDiagnostic::for_rule(
            self,
            format!("Policy '{}' has no name", policy_label(policy)),
        )
        .with_location(ctx.location(&policy.file_context))]
    }
}

/// Checks for the configured set of required tag keys.
pub struct PolicyRequiredTagsMissingRule;

impl LintRule for PolicyRequiredTagsMissingRule {
    fn id(&self) -> RuleId {
        RuleId::new("policy-required-tags-missing")
    }

    fn name(&self) -> &str {
        "Required Policy Tags"
    }

    fn description(&self) -> &str {
        "Policies should carry the required tags"
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn target(&self) -> RuleTarget {
        RuleTarget::Policy
    }

    fn check(&self, ctx: &LintContext<'_>, item: &LintItem<'_>) -> Vec<LintDiagnostic> {
        let LintItem::Policy(policy) = item else {
            return vec![];
        };
        let missing: Vec<&str> = ctx
            .config
            .required_tags
            .iter()
            .filter(|tag| !policy.tags.contains_key(tag.as_str()))
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            return vec![];
        }
        vec![LintDiagnostic::for_rule(
            self,
            format!(
                "Policy '{}' is missing required tags: {}",
                policy_label(policy),
                missing.join(", ")
            ),
        )
        .with_location(ctx.location(&policy.file_context))]
    }
}

pub struct PolicyMissingVersionRule;

impl LintRule for PolicyMissingVersionRule {
    fn id(&self) -> RuleId {
        RuleId::new("policy-missing-version")
    }

    fn name(&self) -> &str {
        "Policy Version"
    }

    fn description(&self) -> &str {
        "Policies must have a version"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn target(&self) -> RuleTarget {
        RuleTarget::Policy
    }

    fn check(&self, ctx: &LintContext<'_>, item: &LintItem<'_>) -> Vec<LintDiagnostic> {
        let LintItem::Policy(policy) = item else {
            return vec![];
        };
        if !policy.version.is_empty() {
            return vec![];
        }
        vec![LintDiagnostic::for_rule(
            self,
            format!("Policy '{}' has no version", policy_label(policy)),
        )
        .with_location(ctx.location(&policy.file_context))]
    }
}

pub struct PolicyWrongVersionRule;

impl LintRule for PolicyWrongVersionRule {
    fn id(&self) -> RuleId {
        RuleId::new("policy-wrong-version")
    }

    fn name(&self) -> &str {
        "Policy Semantic Version"
    }

    fn description(&self) -> &str {
        "Policy versions must follow semantic versioning"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn target(&self) -> RuleTarget {
        RuleTarget::Policy
    }

    fn check(&self, ctx: &LintContext<'_>, item: &LintItem<'_>) -> Vec<LintDiagnostic> {
        let LintItem::Policy(policy) = item else {
            return vec![];
        };
        // an empty version is policy-missing-version's concern
        if policy.version.is_empty() || is_semver(&policy.version) {
            return vec![];
        }
        vec![LintDiagnostic::for_rule(
            self,
            format!(
                "Policy '{}' has version '{}' which is not a semantic version",
                policy_label(policy),
                policy.version
            ),
        )
        .with_location(ctx.location(&policy.file_context))]
    }
}

/// Flags policies and groups that assign nothing.
pub struct PolicyMissingChecksRule;

impl LintRule for PolicyMissingChecksRule {
    fn id(&self) -> RuleId {
        RuleId::new("policy-missing-checks")
    }

    fn name(&self) -> &str {
        "Policy Checks"
    }

    fn description(&self) -> &str {
        "Policies and their groups must assign checks, queries or policies"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn target(&self) -> RuleTarget {
        RuleTarget::Policy
    }

    fn check(&self, ctx: &LintContext<'_>, item: &LintItem<'_>) -> Vec<LintDiagnostic> {
        let LintItem::Policy(policy) = item else {
            return vec![];
        };
        if policy.groups.is_empty() {
            return vec![LintDiagnostic::for_rule(
                self,
                format!("Policy '{}' has no groups", policy_label(policy)),
            )
            .with_location(ctx.location(&policy.file_context))];
        }
        policy
            .groups
            .iter()
            .filter(|group| group.is_empty())
            .map(|group| {
                LintDiagnostic::for_rule(
                    self,
                    format!(
                        "Policy '{}' has a group without checks, queries or policies",
                        policy_label(policy)
                    ),
                )
                .with_location(ctx.location(&group.file_context))
            })
            .collect()
    }
}

/// Requires an asset filter on each check of an unfiltered group.
///
/// A check is scoped when it, or the global query it refers to, declares
/// filters or has variants. A declared but empty filter list counts.
pub struct PolicyMissingAssetFilterRule;

impl PolicyMissingAssetFilterRule {
    fn is_scoped(ctx: &LintContext<'_>, check: &Mquery) -> bool {
        let scoped = |query: &Mquery| query.filters.is_some() || !query.variants.is_empty();
        scoped(check)
            || ctx
                .global_queries_by_uid
                .get(check.uid.as_str())
                .is_some_and(|global| scoped(global))
    }
}

impl LintRule for PolicyMissingAssetFilterRule {
    fn id(&self) -> RuleId {
        RuleId::new("policy-missing-asset-filter")
    }

    fn name(&self) -> &str {
        "Asset Filter"
    }

    fn description(&self) -> &str {
        "Checks must be scoped by an asset filter on the group or the query"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn target(&self) -> RuleTarget {
        RuleTarget::Policy
    }

    fn check(&self, ctx: &LintContext<'_>, item: &LintItem<'_>) -> Vec<LintDiagnostic> {
        let LintItem::Policy(policy) = item else {
            return vec![];
        };
        let mut diagnostics = Vec::new();
        for group in &policy.groups {
            if group.filters.is_some() {
                continue;
            }
            for check in &group.checks {
                if Self::is_scoped(ctx, check) {
                    continue;
                }
                diagnostics.push(
                    LintDiagnostic::for_rule(
                        self,
                        format!(
                            "Check '{}' in policy '{}' has no asset filter",
                            check.uid,
                            policy_label(policy)
                        ),
                    )
                    .with_location(ctx.location(&check.file_context)),
                );
            }
        }
        diagnostics
    }
}

/// Ensures query references in policy groups resolve to a global query.
pub struct PolicyMissingAssignedQueryRule;

impl LintRule for PolicyMissingAssignedQueryRule {
    fn id(&self) -> RuleId {
        RuleId::new("policy-missing-assigned-query")
    }

    fn name(&self) -> &str {
        "Assigned Query Exists"
    }

    fn description(&self) -> &str {
        "Queries referenced by a policy must be defined in the bundle"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn target(&self) -> RuleTarget {
        RuleTarget::Policy
    }

    fn check(&self, ctx: &LintContext<'_>, item: &LintItem<'_>) -> Vec<LintDiagnostic> {
        let LintItem::Policy(policy) = item else {
            return vec![];
        };
        let mut diagnostics = Vec::new();
        for group in &policy.groups {
            for query in group.checks.iter().chain(&group.queries) {
                let message = if query.uid.is_empty() {
                    if query.is_definition_complete() {
                        continue;
                    }
                    format!(
                        "Policy '{}' assigns a query without uid or definition",
                        policy_label(policy)
                    )
                } else if query.is_definition_complete() && !query.refines_global() {
                    continue;
                } else if ctx.global_queries_by_uid.contains_key(query.uid.as_str()) {
                    continue;
                } else {
                    format!(
                        "Policy '{}' assigns query '{}' which is not defined in this bundle",
                        policy_label(policy),
                        query.uid
                    )
                };
                diagnostics.push(
                    LintDiagnostic::for_rule(self, message)
                        .with_location(ctx.location(&query.file_context)),
                );
            }
        }
        diagnostics
    }
}

pub struct PolicyMissingRequireRule;

impl LintRule for PolicyMissingRequireRule {
    fn id(&self) -> RuleId {
        RuleId::new("policy-missing-require")
    }

    fn name(&self) -> &str {
        "Policy Requirements"
    }

    fn description(&self) -> &str {
        "Policies should declare the providers they require"
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn target(&self) -> RuleTarget {
        RuleTarget::Policy
    }

    fn check(&self, ctx: &LintContext<'_>, item: &LintItem<'_>) -> Vec<LintDiagnostic> {
        let LintItem::Policy(policy) = item else {
            return vec![];
        };
        if !policy.require.is_empty() {
            return vec![];
        }
        vec![LintDiagnostic::for_rule(
            self,
            format!("Policy '{}' does not require any provider", policy_label(policy)),
        )
        .with_location(ctx.location(&policy.file_context))]
    }
}
