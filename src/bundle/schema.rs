//! Bundle schema definitions.
//!
//! This module contains the typed records that map to the policy bundle
//! YAML format. Decoding lives in [`super::parse`], canonical serialization in
//! [`super::format`].

use indexmap::IndexMap;
use serde::Serialize;

use super::position::FileContext;

/// Root of a policy bundle file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Bundle {
    #[serde(skip)]
    pub file_context: FileContext,

    /// Owner of every resource declared in this bundle.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub owner_mrn: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<Policy>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub queries: Vec<Mquery>,

    /// Bundle-wide properties (deprecated, see `bundle-global-props-deprecated`).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub props: Vec<Property>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs: Option<PolicyDocs>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub migration_groups: Vec<MigrationGroup>,
}

/// A named, versioned collection of groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Policy {
    #[serde(skip)]
    pub file_context: FileContext,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub uid: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub mrn: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub license: String,

    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub tags: IndexMap<String, String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<Author>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub require: Vec<Requirement>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub summary: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs: Option<PolicyDocs>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<PolicyGroup>,
}

/// Free-form documentation for bundles, policies and groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PolicyDocs {
    #[serde(skip)]
    pub file_context: FileContext,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub desc: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Author {
    #[serde(skip)]
    pub file_context: FileContext,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub email: String,
}

/// A provider a policy needs in order to run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Requirement {
    #[serde(skip)]
    pub file_context: FileContext,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub provider: String,
}

/// Kind of a policy group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    Chapter,
    Import,
    Override,
    Uncategorized,
}

impl GroupType {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "chapter" => Some(Self::Chapter),
            "import" => Some(Self::Import),
            "override" => Some(Self::Override),
            "uncategorized" => Some(Self::Uncategorized),
            _ => None,
        }
    }

    pub const KEYWORDS: &'static [&'static str] = &["chapter", "import", "override", "uncategorized"];
}

/// A group of checks, data queries and sub-policies, optionally scoped by an
/// asset filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PolicyGroup {
    #[serde(skip)]
    pub file_context: FileContext,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub group_type: Option<GroupType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Filters>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<Mquery>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub queries: Vec<Mquery>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<PolicyRef>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs: Option<PolicyDocs>,
}

impl PolicyGroup {
    /// Whether the group assigns anything at all.
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty() && self.queries.is_empty() && self.policies.is_empty()
    }
}

/// Activation state applied to a query or policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    Active,
    Ignore,
    Deactivate,
    Modify,
    OutOfScope,
}

impl Action {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "active" => Some(Self::Active),
            "ignore" => Some(Self::Ignore),
            "deactivate" => Some(Self::Deactivate),
            "modify" => Some(Self::Modify),
            "out-of-scope" => Some(Self::OutOfScope),
            _ => None,
        }
    }

    pub const KEYWORDS: &'static [&'static str] =
        &["active", "ignore", "deactivate", "modify", "out-of-scope"];
}

/// Reference from a group to another policy, by MRN or by UID.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PolicyRef {
    #[serde(skip)]
    pub file_context: FileContext,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub uid: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub mrn: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact: Option<Impact>,
}

/// A query definition or a reference to one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Mquery {
    #[serde(skip)]
    pub file_context: FileContext,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub uid: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub mrn: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact: Option<Impact>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,

    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub tags: IndexMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Filters>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<Mquery>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub mql: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs: Option<MqueryDocs>,
}

impl Mquery {
    /// Whether this record defines a query rather than pointing at one.
    ///
    /// A record with no MQL, title, variants or description is a reference
    /// whose UID must resolve to a global query.
    pub fn is_definition_complete(&self) -> bool {
        !self.mql.is_empty()
            || !self.title.is_empty()
            || !self.variants.is_empty()
            || self.docs.as_ref().is_some_and(|d| !d.desc.is_empty())
    }

    /// Whether an embedded record names a global query it refines.
    ///
    /// Such records override parts of the global query (MQL, filters) and
    /// take the title from it.
    pub fn refines_global(&self) -> bool {
        !self.uid.is_empty() && self.title.is_empty()
    }
}

/// Documentation attached to a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MqueryDocs {
    #[serde(skip)]
    pub file_context: FileContext,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub desc: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub audit: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<Remediation>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub refs: Vec<MqueryRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MqueryRef {
    #[serde(skip)]
    pub file_context: FileContext,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
}

/// Remediation steps; either a single text or a list of identified items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Remediation {
    pub file_context: FileContext,
    pub items: Vec<RemediationItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RemediationItem {
    #[serde(skip)]
    pub file_context: FileContext,

    pub id: String,

    pub desc: String,
}

/// Id given to a remediation written as a bare string.
pub const DEFAULT_REMEDIATION_ID: &str = "default";

/// Asset filters keyed by an arbitrary identifier.
///
/// Keys carry no meaning beyond ordering: a sequence of filters gets keys
/// `"0"`, `"1"`, ... and a bare string gets the key `""`. Equality therefore
/// compares the filter queries in order and ignores their keys.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    pub file_context: FileContext,
    pub items: IndexMap<String, Mquery>,
}

impl Filters {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Build filters from MQL expressions, keyed by position.
    pub fn from_mql<I, S>(expressions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items = expressions
            .into_iter()
            .enumerate()
            .map(|(i, mql)| {
                (
                    i.to_string(),
                    Mquery {
                        mql: mql.into(),
                        ..Default::default()
                    },
                )
            })
            .collect();
        Self {
            file_context: FileContext::default(),
            items,
        }
    }
}

impl PartialEq for Filters {
    fn eq(&self, other: &Self) -> bool {
        self.items.len() == other.items.len()
            && self.items.values().zip(other.items.values()).all(|(a, b)| a == b)
    }
}

/// Scoring system applied to an impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoringSystem {
    Average,
    Weighted,
    Worst,
    Banded,
    Decayed,
    Ignore,
    DataOnly,
}

impl ScoringSystem {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "average" => Some(Self::Average),
            "weighted" => Some(Self::Weighted),
            "worst" => Some(Self::Worst),
            "banded" => Some(Self::Banded),
            "decayed" => Some(Self::Decayed),
            "ignore" => Some(Self::Ignore),
            "data-only" => Some(Self::DataOnly),
            _ => None,
        }
    }

    pub const KEYWORDS: &'static [&'static str] = &[
        "average", "weighted", "worst", "banded", "decayed", "ignore", "data-only",
    ];
}

/// Impact of a failing check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Impact {
    pub file_context: FileContext,
    pub value: Option<ImpactValue>,
    pub scoring: Option<ScoringSystem>,
    pub weight: i32,
    pub action: Option<Action>,
}

impl Impact {
    /// Impact written as a bare integer.
    pub fn from_value(value: i32) -> Self {
        Self {
            value: Some(ImpactValue {
                file_context: FileContext::default(),
                value,
            }),
            ..Default::default()
        }
    }

    /// Whether every field besides the value is at its default.
    pub fn is_bare(&self) -> bool {
        self.value.is_some() && self.scoring.is_none() && self.weight == 0 && self.action.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImpactValue {
    #[serde(skip)]
    pub file_context: FileContext,

    pub value: i32,
}

/// A bundle-wide property.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Property {
    #[serde(skip)]
    pub file_context: FileContext,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub uid: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub mrn: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub mql: String,
}

/// A named migration plan, executed stage by stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MigrationGroup {
    #[serde(skip)]
    pub file_context: FileContext,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<MigrationStage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MigrationStage {
    #[serde(skip)]
    pub file_context: FileContext,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub migrations: Vec<Migration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationAction {
    Create,
    Modify,
    Delete,
}

impl MigrationAction {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "create" => Some(Self::Create),
            "modify" => Some(Self::Modify),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }

    pub const KEYWORDS: &'static [&'static str] = &["create", "modify", "delete"];
}

impl std::fmt::Display for MigrationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationAction::Create => write!(f, "create"),
            MigrationAction::Modify => write!(f, "modify"),
            MigrationAction::Delete => write!(f, "delete"),
        }
    }
}

/// A single query transition inside a migration stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Migration {
    #[serde(skip)]
    pub file_context: FileContext,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<MigrationAction>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<MigrationRef>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<MigrationRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MigrationRef {
    #[serde(skip)]
    pub file_context: FileContext,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub uid: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub sha256: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_is_not_a_complete_definition() {
        let reference = Mquery {
            uid: "sshd-check".to_string(),
            ..Default::default()
        };
        assert!(!reference.is_definition_complete());
    }

    #[test]
    fn description_alone_completes_a_definition() {
        let query = Mquery {
            docs: Some(MqueryDocs {
                desc: "Ensure sshd is hardened".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(query.is_definition_complete());
    }

    #[test]
    fn untitled_query_with_uid_refines_global() {
        let query = Mquery {
            uid: "sshd-check".to_string(),
            mql: "sshd.config.params".to_string(),
            ..Default::default()
        };
        assert!(query.refines_global());
        assert!(query.is_definition_complete());
    }

    #[test]
    fn filters_equality_ignores_keys() {
        let mut keyed = Filters::default();
        keyed.items.insert(
            String::new(),
            Mquery {
                mql: "asset.family.contains('unix')".to_string(),
                ..Default::default()
            },
        );
        let positional = Filters::from_mql(["asset.family.contains('unix')"]);
        assert_eq!(keyed, positional);
    }

    #[test]
    fn bare_impact_has_only_a_value() {
        assert!(Impact::from_value(80).is_bare());
        let weighted = Impact {
            weight: 2,
            ..Impact::from_value(80)
        };
        assert!(!weighted.is_bare());
    }

    #[test]
    fn empty_group_assigns_nothing() {
        assert!(PolicyGroup::default().is_empty());
    }

    #[test]
    fn keyword_tables_round_trip() {
        for keyword in Action::KEYWORDS {
            assert!(Action::from_keyword(keyword).is_some());
        }
        for keyword in ScoringSystem::KEYWORDS {
            assert!(ScoringSystem::from_keyword(keyword).is_some());
        }
        for keyword in GroupType::KEYWORDS {
            assert!(GroupType::from_keyword(keyword).is_some());
        }
        for keyword in MigrationAction::KEYWORDS {
            assert!(MigrationAction::from_keyword(keyword).is_some());
        }
        assert!(Action::from_keyword("enabled").is_none());
    }
}
