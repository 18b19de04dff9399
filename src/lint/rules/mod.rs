//! Built-in lint rules.
//!
//! This module contains all the built-in validation rules, grouped by the
//! kind of bundle item they inspect.

use std::sync::LazyLock;

use regex::Regex;

pub mod bundle;
pub mod migrations;
pub mod pipeline;
pub mod policy;
pub mod query;

pub use bundle::GlobalPropsDeprecatedRule;
pub use migrations::{
    MigrationConfigurationRule, MigrationCrossStageProduceRule, MigrationStagesRule,
};
pub use pipeline::{BUNDLE_COMPILE_ERROR, BUNDLE_INVALID, BUNDLE_UNKNOWN_FIELD};
pub use policy::{
    PolicyMissingAssetFilterRule, PolicyMissingAssignedQueryRule, PolicyMissingChecksRule,
    PolicyMissingRequireRule, PolicyMissingVersionRule, PolicyNameRule,
    PolicyRequiredTagsMissingRule, PolicyUidRule, PolicyUidUniqueRule, PolicyWrongVersionRule,
};
pub use query::{
    QueryMissingMqlRule, QueryNameRule, QueryUidRule, QueryUidUniqueRule, QueryUnassignedRule,
    QueryUsedAsDifferentTypesRule, QueryVariantFieldsRule,
};

/// Lowercase alphanumerics, dot, hyphen and underscore; 5 to 200 characters.
static UID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9._-]{5,200}$").expect("UID_REGEX must compile")
});

/// Semantic version 2.0.0.
static SEMVER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(?:-((?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*)(?:\.(?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*))*))?(?:\+([0-9a-zA-Z-]+(?:\.[0-9a-zA-Z-]+)*))?$",
    )
    .expect("SEMVER_REGEX must compile")
});

pub fn is_valid_uid(uid: &str) -> bool {
    UID_REGEX.is_match(uid)
}

pub fn is_semver(version: &str) -> bool {
    SEMVER_REGEX.is_match(version)
}

/// Message for a UID that fails [`is_valid_uid`].
pub(crate) fn invalid_uid_message(kind: &str, uid: &str) -> String {
    format!(
        "{kind} uid '{uid}' is invalid: use 5 to 200 characters of a-z, 0-9, '.', '-' or '_'"
    )
}
