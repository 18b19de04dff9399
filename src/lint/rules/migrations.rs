//! Migration group rules.
//!
//! A migration moves query UIDs through ordered stages. `create` produces
//! its destination UID, `delete` consumes its source UID and `modify` does
//! both. Within a stage a UID may be produced once and consumed once, never
//! both, unless a single `modify` rewrites it in place.

use std::collections::HashMap;

use crate::bundle::{Migration, MigrationAction, MigrationRef, MigrationStage};
use crate::lint::context::LintContext;
use crate::lint::{LintDiagnostic, LintItem, LintRule, RuleId, RuleTarget, Severity};

use super::{invalid_uid_message, is_valid_uid};

/// Check the shape of one migration record.
pub fn validate_migration(migration: &Migration) -> Result<(), String> {
    let Some(action) = migration.action else {
        return Err("Migration has no action".to_string());
    };
    let (needs_source, needs_destination) = match action {
        MigrationAction::Create => (false, true),
        MigrationAction::Delete => (true, false),
        MigrationAction::Modify => (true, true),
    };
    let references = [
        ("source", &migration.source, needs_source),
        ("destination", &migration.destination, needs_destination),
    ];
    // a missing reference is reported before a forbidden one
    for (name, reference, required) in &references {
        if *required && reference.is_none() {
            return Err(format!("Migration '{action}' needs a {name}"));
        }
    }
    for (name, reference, required) in &references {
        match reference {
            Some(_) if !required => {
                return Err(format!("Migration '{action}' must not have a {name}"))
            }
            Some(reference) => validate_reference(name, reference)?,
            None => {}
        }
    }
    Ok(())
}

fn validate_reference(name: &str, reference: &MigrationRef) -> Result<(), String> {
    if reference.uid.is_empty() {
        return Err(format!("Migration {name} has no uid"));
    }
    if !is_valid_uid(&reference.uid) {
        return Err(invalid_uid_message(&format!("Migration {name}"), &reference.uid));
    }
    if !reference.sha256.is_empty()
        && (reference.sha256.len() != 64 || hex::decode(&reference.sha256).is_err())
    {
        return Err(format!(
            "Migration {name} '{}' has an invalid sha256 '{}'",
            reference.uid, reference.sha256
        ));
    }
    Ok(())
}

/// UID a migration makes available.
pub fn produced_uid(migration: &Migration) -> Option<&str> {
    match migration.action? {
        MigrationAction::Create | MigrationAction::Modify => {
            migration.destination.as_ref().map(|d| d.uid.as_str())
        }
        MigrationAction::Delete => None,
    }
}

/// UID a migration retires.
pub fn consumed_uid(migration: &Migration) -> Option<&str> {
    match migration.action? {
        MigrationAction::Modify | MigrationAction::Delete => {
            migration.source.as_ref().map(|s| s.uid.as_str())
        }
        MigrationAction::Create => None,
    }
}

/// What a stage produces and consumes, by UID.
#[derive(Debug, Default)]
pub struct StageSummary<'a> {
    pub produced: HashMap<&'a str, &'a Migration>,
    pub consumed: HashMap<&'a str, &'a Migration>,
}

/// A migration that breaks the stage's produce/consume bookkeeping.
#[derive(Debug)]
pub struct StageConflict<'a> {
    pub migration: &'a Migration,
    pub message: String,
}

/// Summarize a stage, collecting conflicts in migration order.
///
/// Structurally invalid migrations are skipped.
pub fn summarize_stage(stage: &MigrationStage) -> (StageSummary<'_>, Vec<StageConflict<'_>>) {
    let mut summary = StageSummary::default();
    let mut conflicts = Vec::new();

    for migration in &stage.migrations {
        if validate_migration(migration).is_err() {
            continue;
        }
        if let Some(uid) = produced_uid(migration) {
            if summary.produced.contains_key(uid) {
                conflicts.push(StageConflict {
                    migration,
                    message: format!("UID '{uid}' is produced more than once in this stage"),
                });
            } else if summary.consumed.contains_key(uid) {
                conflicts.push(StageConflict {
                    migration,
                    message: format!("UID '{uid}' is both consumed and produced in this stage"),
                });
            } else {
                summary.produced.insert(uid, migration);
            }
        }
        if let Some(uid) = consumed_uid(migration) {
            let produced_elsewhere = summary
                .produced
                .get(uid)
                .is_some_and(|producer| !std::ptr::eq(*producer, migration));
            if summary.consumed.contains_key(uid) {
                conflicts.push(StageConflict {
                    migration,
                    message: format!("UID '{uid}' is consumed more than once in this stage"),
                });
            } else if produced_elsewhere {
                conflicts.push(StageConflict {
                    migration,
                    message: format!("UID '{uid}' is both produced and consumed in this stage"),
                });
            } else {
                summary.consumed.insert(uid, migration);
            }
        }
    }

    (summary, conflicts)
}

/// Structural validation of each migration record.
pub struct MigrationConfigurationRule;

impl LintRule for MigrationConfigurationRule {
    fn id(&self) -> RuleId {
        RuleId::new("bundle-migrations-configuration-validation")
    }

    fn name(&self) -> &str {
        "Migration Configuration"
    }

    fn description(&self) -> &str {
        "Migrations must have an action with matching source and destination"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn target(&self) -> RuleTarget {
        RuleTarget::MigrationGroup
    }

    fn check(&self, ctx: &LintContext<'_>, item: &LintItem<'_>) -> Vec<LintDiagnostic> {
        let LintItem::MigrationGroup(group) = item else {
            return vec![];
        };
        group
            .stages
            .iter()
            .flat_map(|stage| &stage.migrations)
            .filter_map(|migration| {
                validate_migration(migration).err().map(|message| {
                    LintDiagnostic::for_rule(self, message)
                        .with_location(ctx.location(&migration.file_context))
                })
            })
            .collect()
    }
}

pub struct MigrationStagesRule;

impl LintRule for MigrationStagesRule {
    fn id(&self) -> RuleId {
        RuleId::new("bundle-migrations-validate-stages")
    }

    fn name(&self) -> &str {
        "Migration Stages"
    }

    fn description(&self) -> &str {
        "Each UID may be produced and consumed at most once per stage"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn target(&self) -> RuleTarget {
        RuleTarget::MigrationGroup
    }

    fn check(&self, ctx: &LintContext<'_>, item: &LintItem<'_>) -> Vec<LintDiagnostic> {
        let LintItem::MigrationGroup(group) = item else {
            return vec![];
        };
        group
            .stages
            .iter()
            .flat_map(|stage| summarize_stage(stage).1)
            .map(|conflict| {
                LintDiagnostic::for_rule(self, conflict.message)
                    .with_location(ctx.location(&conflict.migration.file_context))
            })
            .collect()
    }
}

/// Every UID a stage produces must be consumed later or exist in the bundle.
pub struct MigrationCrossStageProduceRule;

impl MigrationCrossStageProduceRule {
    fn exists_in_bundle(ctx: &LintContext<'_>, uid: &str) -> bool {
        ctx.global_queries_by_uid.contains_key(uid)
            || ctx.policy_uids_in_file.contains_key(uid)
            || ctx.assigned_query_uids.contains(uid)
    }
}

impl LintRule for MigrationCrossStageProduceRule {
    fn id(&self) -> RuleId {
        RuleId::new("bundle-migrations-validate-cross-stage-produce")
    }

    fn name(&self) -> &str {
        "Migration Produced UIDs"
    }

    fn description(&self) -> &str {
        "UIDs produced by a stage must be consumed later or defined in the bundle"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn target(&self) -> RuleTarget {
        RuleTarget::MigrationGroup
    }

    fn check(&self, ctx: &LintContext<'_>, item: &LintItem<'_>) -> Vec<LintDiagnostic> {
        let LintItem::MigrationGroup(group) = item else {
            return vec![];
        };
        let summaries: Vec<StageSummary<'_>> = group
            .stages
            .iter()
            .map(|stage| summarize_stage(stage).0)
            .collect();

        let mut diagnostics = Vec::new();
        for (index, stage) in group.stages.iter().enumerate() {
            for migration in &stage.migrations {
                let Some(uid) = produced_uid(migration) else {
                    continue;
                };
                let is_producer = summaries[index]
                    .produced
                    .get(uid)
                    .is_some_and(|producer| std::ptr::eq(*producer, migration));
                if !is_producer {
                    continue;
                }
                let consumed_later = summaries[index + 1..]
                    .iter()
                    .any(|later| later.consumed.contains_key(uid));
                if consumed_later || Self::exists_in_bundle(ctx, uid) {
                    continue;
                }
                diagnostics.push(
                    LintDiagnostic::for_rule(
                        self,
                        format!(
                            "UID '{uid}' produced in stage {} is never consumed and not defined in the bundle",
                            index + 1
                        ),
                    )
                    .with_location(ctx.location(&migration.file_context)),
                );
            }
        }
        diagnostics
    }
}
