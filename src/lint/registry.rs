//! Rule registry for managing lint rules.
//!
//! The [`RuleRegistry`] stores lint rules in registration order. That order
//! is the dispatch order within each item kind and the order in which SARIF
//! reports list rule descriptors, so `ruleIndex` values are stable.

use std::collections::HashMap;
use std::sync::LazyLock;

use super::rule::{LintRule, RuleId, RuleTarget};
use super::rules::{
    GlobalPropsDeprecatedRule, MigrationConfigurationRule, MigrationCrossStageProduceRule,
    MigrationStagesRule, PolicyMissingAssetFilterRule, PolicyMissingAssignedQueryRule,
    PolicyMissingChecksRule, PolicyMissingRequireRule, PolicyMissingVersionRule, PolicyNameRule,
    PolicyRequiredTagsMissingRule, PolicyUidRule, PolicyUidUniqueRule, PolicyWrongVersionRule,
    QueryMissingMqlRule, QueryNameRule, QueryUidRule, QueryUidUniqueRule, QueryUnassignedRule,
    QueryUsedAsDifferentTypesRule, QueryVariantFieldsRule, BUNDLE_COMPILE_ERROR, BUNDLE_INVALID,
    BUNDLE_UNKNOWN_FIELD,
};

static BUILTIN: LazyLock<RuleRegistry> = LazyLock::new(RuleRegistry::with_builtins);

/// Registry of lint rules.
pub struct RuleRegistry {
    rules: Vec<Box<dyn LintRule>>,
    index: HashMap<RuleId, usize>,
}

impl RuleRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Create a registry with all built-in rules.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(BUNDLE_INVALID));
        registry.register(Box::new(BUNDLE_UNKNOWN_FIELD));
        registry.register(Box::new(BUNDLE_COMPILE_ERROR));

        registry.register(Box::new(PolicyUidRule));
        registry.register(Box::new(PolicyUidUniqueRule));
        registry.register(Box::new(PolicyNameRule));
        registry.register(Box::new(PolicyRequiredTagsMissingRule));
        registry.register(Box::new(PolicyMissingVersionRule));
        registry.register(Box::new(PolicyWrongVersionRule));
        registry.register(Box::new(PolicyMissingChecksRule));
        registry.register(Box::new(PolicyMissingAssetFilterRule));
        registry.register(Box::new(PolicyMissingAssignedQueryRule));
        registry.register(Box::new(PolicyMissingRequireRule));

        registry.register(Box::new(QueryUidRule));
        registry.register(Box::new(QueryNameRule));
        registry.register(Box::new(QueryUidUniqueRule));
        registry.register(Box::new(QueryMissingMqlRule));
        registry.register(Box::new(QueryVariantFieldsRule));
        registry.register(Box::new(QueryUnassignedRule));
        registry.register(Box::new(QueryUsedAsDifferentTypesRule));

        registry.register(Box::new(GlobalPropsDeprecatedRule));
        registry.register(Box::new(MigrationConfigurationRule));
        registry.register(Box::new(MigrationStagesRule));
        registry.register(Box::new(MigrationCrossStageProduceRule));
        registry
    }

    /// The process-wide built-in registry, built on first use.
    pub fn builtin() -> &'static RuleRegistry {
        &BUILTIN
    }

    /// Register a lint rule.
    ///
    /// A rule with an id that is already registered replaces the old rule in
    /// place.
    pub fn register(&mut self, rule: Box<dyn LintRule>) {
        let id = rule.id();
        match self.index.get(&id) {
            Some(&position) => self.rules[position] = rule,
            None => {
                self.index.insert(id, self.rules.len());
                self.rules.push(rule);
            }
        }
    }

    /// Get a rule by ID.
    pub fn get(&self, id: &RuleId) -> Option<&dyn LintRule> {
        self.index_of(id).map(|position| self.rules[position].as_ref())
    }

    /// Position of a rule in registration order.
    pub fn index_of(&self, id: &RuleId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Iterate over all rules in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn LintRule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    /// Rules dispatched over the given kind of item.
    pub fn for_target(&self, target: RuleTarget) -> impl Iterator<Item = &dyn LintRule> {
        self.iter().filter(move |rule| rule.target() == target)
    }

    /// Get the number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lint::context::LintContext;
    use crate::lint::{LintDiagnostic, LintItem, Severity};

    struct MockRule {
        id: RuleId,
        name: &'static str,
    }

    impl LintRule for MockRule {
        fn id(&self) -> RuleId {
            self.id.clone()
        }
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "A mock rule for testing"
        }
        fn default_severity(&self) -> Severity {
            Severity::Warning
        }
        fn target(&self) -> RuleTarget {
            RuleTarget::Bundle
        }
        fn check(&self, _ctx: &LintContext<'_>, _item: &LintItem<'_>) -> Vec<LintDiagnostic> {
            vec![]
        }
    }

    fn mock(id: &str, name: &'static str) -> Box<dyn LintRule> {
        Box::new(MockRule {
            id: RuleId::new(id),
            name,
        })
    }

    #[test]
    fn registry_new_is_empty() {
        let registry = RuleRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn registry_register_and_get() {
        let mut registry = RuleRegistry::new();
        registry.register(mock("mock", "Mock"));

        assert!(!registry.is_empty());
        assert!(registry.get(&RuleId::new("mock")).is_some());
        assert!(registry.get(&RuleId::new("unknown")).is_none());
    }

    #[test]
    fn registry_keeps_registration_order() {
        let mut registry = RuleRegistry::new();
        registry.register(mock("zeta", "Z"));
        registry.register(mock("alpha", "A"));

        let ids: Vec<String> = registry.iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, vec!["zeta", "alpha"]);
        assert_eq!(registry.index_of(&RuleId::new("alpha")), Some(1));
    }

    #[test]
    fn re_registering_replaces_in_place() {
        let mut registry = RuleRegistry::new();
        registry.register(mock("first", "Old"));
        registry.register(mock("second", "Second"));
        registry.register(mock("first", "New"));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.index_of(&RuleId::new("first")), Some(0));
        assert_eq!(registry.get(&RuleId::new("first")).map(|r| r.name()), Some("New"));
    }

    #[test]
    fn registry_with_builtins_has_rules() {
        let registry = RuleRegistry::with_builtins();
        assert_eq!(registry.len(), 24);
        for id in [
            "bundle-invalid",
            "bundle-unknown-field",
            "bundle-compile-error",
            "policy-uid",
            "policy-uid-unique",
            "policy-missing-assigned-query",
            "query-unassigned",
            "query-used-as-different-types",
            "bundle-global-props-deprecated",
            "bundle-migrations-validate-cross-stage-produce",
        ] {
            assert!(registry.get(&RuleId::new(id)).is_some(), "{id} missing");
        }
    }

    #[test]
    fn builtin_targets_partition_rules() {
        let registry = RuleRegistry::builtin();
        assert_eq!(registry.for_target(RuleTarget::Pipeline).count(), 3);
        assert_eq!(registry.for_target(RuleTarget::Policy).count(), 10);
        assert_eq!(registry.for_target(RuleTarget::Query).count(), 6);
        assert_eq!(registry.for_target(RuleTarget::Bundle).count(), 2);
        assert_eq!(registry.for_target(RuleTarget::MigrationGroup).count(), 3);
    }
}
