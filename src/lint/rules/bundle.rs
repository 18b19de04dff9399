//! Bundle-level rules.

use crate::lint::context::LintContext;
use crate::lint::{LintDiagnostic, LintItem, LintRule, RuleId, RuleTarget, Severity};

/// Top-level `props` are deprecated in favor of query-level properties.
pub struct GlobalPropsDeprecatedRule;

impl LintRule for GlobalPropsDeprecatedRule {
    fn id(&self) -> RuleId {
        RuleId::new("bundle-global-props-deprecated")
    }

    fn name(&self) -> &str {
        "Global Props Deprecated"
    }

    fn description(&self) -> &str {
        "Bundle-wide props are deprecated"
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn target(&self) -> RuleTarget {
        RuleTarget::Bundle
    }

    fn check(&self, ctx: &LintContext<'_>, item: &LintItem<'_>) -> Vec<LintDiagnostic> {
        let LintItem::Bundle(bundle) = item else {
            return vec![];
        };
        let Some(first) = bundle.props.first() else {
            return vec![];
        };
        vec![LintDiagnostic::for_rule(
            self,
            "Bundle declares global props; define properties on the queries that use them",
        )
        .with_location(ctx.location(&first.file_context))]
    }
}
