//! Rules reported by the lint pipeline itself.
//!
//! Parse failures and compiler failures are detected by the runner, not by
//! walking a bundle. They are still registered so that reports can describe
//! them.

use crate::lint::context::LintContext;
use crate::lint::{LintDiagnostic, LintItem, LintRule, RuleId, RuleTarget, Severity};

/// Descriptor for a diagnostic produced outside of rule dispatch.
pub struct PipelineRule {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const BUNDLE_INVALID: PipelineRule = PipelineRule {
    id: "bundle-invalid",
    name: "Invalid Bundle",
    description: "Bundle files must be valid YAML matching the bundle schema",
};

pub const BUNDLE_UNKNOWN_FIELD: PipelineRule = PipelineRule {
    id: "bundle-unknown-field",
    name: "Unknown Field",
    description: "Bundle files must only use known fields",
};

pub const BUNDLE_COMPILE_ERROR: PipelineRule = PipelineRule {
    id: "bundle-compile-error",
    name: "Bundle Compilation",
    description: "The combined bundle must compile",
};

impl LintRule for PipelineRule {
    fn id(&self) -> RuleId {
        RuleId::new(self.id)
    }

    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn target(&self) -> RuleTarget {
        RuleTarget::Pipeline
    }

    fn check(&self, _ctx: &LintContext<'_>, _item: &LintItem<'_>) -> Vec<LintDiagnostic> {
        vec![]
    }
}
