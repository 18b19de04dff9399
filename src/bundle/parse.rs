//! Bundle parsing.
//!
//! Turns YAML text into a [`Bundle`] tree, stamping a [`FileContext`] on every
//! record. Polymorphic fields (`filters`, `impact`, `remediation`) are tried
//! in the documented order.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use marked_yaml::Node;

use super::decode::{
    decode_shapes, is_null, scalar_int, scalar_str, Attempt, Decode, DecodeError, DecodeResult,
    Fields, Shape,
};
use super::position::attach_position;
use super::schema::*;
use crate::error::{LintError, Result};

const BUNDLE_FIELDS: &[&str] = &[
    "owner_mrn",
    "policies",
    "queries",
    "props",
    "docs",
    "migration_groups",
];
const POLICY_FIELDS: &[&str] = &[
    "uid", "mrn", "name", "version", "license", "tags", "authors", "require", "summary", "docs",
    "groups",
];
const GROUP_FIELDS: &[&str] = &[
    "title", "type", "filters", "checks", "queries", "policies", "docs",
];
const POLICY_REF_FIELDS: &[&str] = &["uid", "mrn", "action", "impact"];
const MQUERY_FIELDS: &[&str] = &[
    "uid", "mrn", "title", "impact", "action", "tags", "filters", "variants", "mql", "docs",
];
const MQUERY_DOCS_FIELDS: &[&str] = &["desc", "audit", "remediation", "refs"];
const MQUERY_REF_FIELDS: &[&str] = &["title", "url"];
const REMEDIATION_ITEM_FIELDS: &[&str] = &["id", "desc"];
const IMPACT_FIELDS: &[&str] = &["value", "scoring", "weight", "action"];
const IMPACT_VALUE_FIELDS: &[&str] = &["value"];
const PROPERTY_FIELDS: &[&str] = &["uid", "mrn", "title", "mql"];
const AUTHOR_FIELDS: &[&str] = &["name", "email"];
const REQUIREMENT_FIELDS: &[&str] = &["provider"];
const DOCS_FIELDS: &[&str] = &["desc"];
const MIGRATION_GROUP_FIELDS: &[&str] = &["title", "stages"];
const MIGRATION_STAGE_FIELDS: &[&str] = &["title", "migrations"];
const MIGRATION_FIELDS: &[&str] = &["action", "source", "destination"];
const MIGRATION_REF_FIELDS: &[&str] = &["uid", "sha256"];

/// Parse bundle bytes.
///
/// Malformed UTF-8 or YAML yields a [`DecodeErrorKind::Syntax`] error at
/// `1:1`. A document without any content parses as an empty bundle.
///
/// [`DecodeErrorKind::Syntax`]: super::decode::DecodeErrorKind::Syntax
pub fn parse(bytes: &[u8]) -> DecodeResult<Bundle> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| DecodeError::syntax(format!("bundle is not valid UTF-8: {e}")))?;
    parse_str(text)
}

/// Parse bundle text.
pub fn parse_str(text: &str) -> DecodeResult<Bundle> {
    if is_blank_document(text) {
        return Ok(Bundle::default());
    }
    let node = marked_yaml::parse_yaml(0, text)
        .map_err(|e| DecodeError::syntax(format!("failed to parse bundle: {e}")))?;
    Bundle::decode(&node)
}

/// Read and parse a bundle file.
///
/// I/O failures are returned as errors; decode failures are returned in the
/// inner result so callers can turn them into diagnostics.
pub fn parse_file(path: &Path) -> Result<DecodeResult<Bundle>> {
    let bytes = fs::read(path).map_err(|source| LintError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse(&bytes))
}

fn is_blank_document(text: &str) -> bool {
    text.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#') || line == "---" || line == "..."
    })
}

impl Decode for Bundle {
    fn decode(node: &Node) -> DecodeResult<Self> {
        let fields = Fields::of(node, "bundle", BUNDLE_FIELDS)?;
        Ok(Bundle {
            file_context: attach_position(node),
            owner_mrn: fields.string("owner_mrn")?,
            policies: fields.list("policies")?,
            queries: fields.list("queries")?,
            props: fields.list("props")?,
            docs: fields.decode("docs")?,
            migration_groups: fields.list("migration_groups")?,
        })
    }
}

impl Decode for Policy {
    fn decode(node: &Node) -> DecodeResult<Self> {
        let fields = Fields::of(node, "policy", POLICY_FIELDS)?;
        Ok(Policy {
            file_context: attach_position(node),
            uid: fields.string("uid")?,
            mrn: fields.string("mrn")?,
            name: fields.string("name")?,
            version: fields.string("version")?,
            license: fields.string("license")?,
            tags: fields.string_map("tags")?,
            authors: fields.list("authors")?,
            require: fields.list("require")?,
            summary: fields.string("summary")?,
            docs: fields.decode("docs")?,
            groups: fields.list("groups")?,
        })
    }
}

impl Decode for PolicyDocs {
    fn decode(node: &Node) -> DecodeResult<Self> {
        let fields = Fields::of(node, "docs", DOCS_FIELDS)?;
        Ok(PolicyDocs {
            file_context: attach_position(node),
            desc: fields.string("desc")?,
        })
    }
}

impl Decode for Author {
    fn decode(node: &Node) -> DecodeResult<Self> {
        let fields = Fields::of(node, "author", AUTHOR_FIELDS)?;
        Ok(Author {
            file_context: attach_position(node),
            name: fields.string("name")?,
            email: fields.string("email")?,
        })
    }
}

impl Decode for Requirement {
    fn decode(node: &Node) -> DecodeResult<Self> {
        let fields = Fields::of(node, "require", REQUIREMENT_FIELDS)?;
        Ok(Requirement {
            file_context: attach_position(node),
            provider: fields.string("provider")?,
        })
    }
}

impl Decode for PolicyGroup {
    fn decode(node: &Node) -> DecodeResult<Self> {
        let fields = Fields::of(node, "group", GROUP_FIELDS)?;
        Ok(PolicyGroup {
            file_context: attach_position(node),
            title: fields.string("title")?,
            group_type: fields.keyword("type", GroupType::from_keyword, GroupType::KEYWORDS)?,
            filters: fields.decode("filters")?,
            checks: fields.list("checks")?,
            queries: fields.list("queries")?,
            policies: fields.list("policies")?,
            docs: fields.decode("docs")?,
        })
    }
}

impl Decode for PolicyRef {
    fn decode(node: &Node) -> DecodeResult<Self> {
        let fields = Fields::of(node, "policy reference", POLICY_REF_FIELDS)?;
        Ok(PolicyRef {
            file_context: attach_position(node),
            uid: fields.string("uid")?,
            mrn: fields.string("mrn")?,
            action: fields.keyword("action", Action::from_keyword, Action::KEYWORDS)?,
            impact: fields.decode("impact")?,
        })
    }
}

impl Decode for Mquery {
    fn decode(node: &Node) -> DecodeResult<Self> {
        let fields = Fields::of(node, "query", MQUERY_FIELDS)?;
        Ok(Mquery {
            file_context: attach_position(node),
            uid: fields.string("uid")?,
            mrn: fields.string("mrn")?,
            title: fields.string("title")?,
            impact: fields.decode("impact")?,
            action: fields.keyword("action", Action::from_keyword, Action::KEYWORDS)?,
            tags: fields.string_map("tags")?,
            filters: fields.decode("filters")?,
            variants: fields.list("variants")?,
            mql: fields.string("mql")?,
            docs: fields.decode("docs")?,
        })
    }
}

impl Decode for MqueryDocs {
    fn decode(node: &Node) -> DecodeResult<Self> {
        let fields = Fields::of(node, "query docs", MQUERY_DOCS_FIELDS)?;
        Ok(MqueryDocs {
            file_context: attach_position(node),
            desc: fields.string("desc")?,
            audit: fields.string("audit")?,
            remediation: fields.decode("remediation")?,
            refs: fields.list("refs")?,
        })
    }
}

impl Decode for MqueryRef {
    fn decode(node: &Node) -> DecodeResult<Self> {
        let fields = Fields::of(node, "reference", MQUERY_REF_FIELDS)?;
        Ok(MqueryRef {
            file_context: attach_position(node),
            title: fields.string("title")?,
            url: fields.string("url")?,
        })
    }
}

impl Decode for RemediationItem {
    fn decode(node: &Node) -> DecodeResult<Self> {
        let fields = Fields::of(node, "remediation item", REMEDIATION_ITEM_FIELDS)?;
        Ok(RemediationItem {
            file_context: attach_position(node),
            id: fields.string("id")?,
            desc: fields.string("desc")?,
        })
    }
}

impl Decode for Remediation {
    fn decode(node: &Node) -> DecodeResult<Self> {
        decode_shapes(
            node,
            "remediation",
            &[
                Attempt {
                    shape: Shape::Bare,
                    label: "string",
                    decode: remediation_from_string,
                },
                Attempt {
                    shape: Shape::Seq,
                    label: "sequence of items",
                    decode: remediation_from_items,
                },
            ],
        )
    }
}

fn remediation_from_string(node: &Node) -> DecodeResult<Remediation> {
    let position = attach_position(node);
    Ok(Remediation {
        file_context: position,
        items: vec![RemediationItem {
            file_context: position,
            id: DEFAULT_REMEDIATION_ID.to_string(),
            desc: scalar_str(node, "remediation")?.to_string(),
        }],
    })
}

fn remediation_from_items(node: &Node) -> DecodeResult<Remediation> {
    let items = node
        .as_sequence()
        .map(|seq| seq.iter().map(RemediationItem::decode).collect())
        .unwrap_or_else(|| Ok(Vec::new()))?;
    Ok(Remediation {
        file_context: attach_position(node),
        items,
    })
}

impl Decode for Filters {
    fn decode(node: &Node) -> DecodeResult<Self> {
        decode_shapes(
            node,
            "filters",
            &[
                Attempt {
                    shape: Shape::Bare,
                    label: "string",
                    decode: filters_from_string,
                },
                Attempt {
                    shape: Shape::Seq,
                    label: "sequence of strings",
                    decode: filters_from_strings,
                },
                Attempt {
                    shape: Shape::Seq,
                    label: "sequence of queries",
                    decode: filters_from_queries,
                },
                Attempt {
                    shape: Shape::Map,
                    label: "mapping of queries",
                    decode: filters_from_mapping,
                },
            ],
        )
    }
}

fn mql_only(node: &Node, what: &str) -> DecodeResult<Mquery> {
    Ok(Mquery {
        file_context: attach_position(node),
        mql: scalar_str(node, what)?.to_string(),
        ..Default::default()
    })
}

fn filters_from_string(node: &Node) -> DecodeResult<Filters> {
    let mut items = IndexMap::new();
    items.insert(String::new(), mql_only(node, "filters")?);
    Ok(Filters {
        file_context: attach_position(node),
        items,
    })
}

fn filters_from_strings(node: &Node) -> DecodeResult<Filters> {
    let mut items = IndexMap::new();
    if let Some(seq) = node.as_sequence() {
        for (i, item) in seq.iter().enumerate() {
            items.insert(i.to_string(), mql_only(item, "filters item")?);
        }
    }
    Ok(Filters {
        file_context: attach_position(node),
        items,
    })
}

fn filters_from_queries(node: &Node) -> DecodeResult<Filters> {
    let mut items = IndexMap::new();
    if let Some(seq) = node.as_sequence() {
        for (i, item) in seq.iter().enumerate() {
            items.insert(i.to_string(), Mquery::decode(item)?);
        }
    }
    Ok(Filters {
        file_context: attach_position(node),
        items,
    })
}

fn filters_from_mapping(node: &Node) -> DecodeResult<Filters> {
    let mut items = IndexMap::new();
    if let Some(map) = node.as_mapping() {
        for (key, value) in map.iter() {
            items.insert(key.as_str().to_string(), Mquery::decode(value)?);
        }
    }
    Ok(Filters {
        file_context: attach_position(node),
        items,
    })
}

impl Decode for Impact {
    fn decode(node: &Node) -> DecodeResult<Self> {
        decode_shapes(
            node,
            "impact",
            &[
                Attempt {
                    shape: Shape::Bare,
                    label: "integer",
                    decode: impact_from_int,
                },
                Attempt {
                    shape: Shape::Map,
                    label: "impact record",
                    decode: impact_from_record,
                },
            ],
        )
    }
}

fn impact_from_int(node: &Node) -> DecodeResult<Impact> {
    let position = attach_position(node);
    Ok(Impact {
        file_context: position,
        value: Some(ImpactValue {
            file_context: position,
            value: impact_score(node)?,
        }),
        ..Default::default()
    })
}

fn impact_from_record(node: &Node) -> DecodeResult<Impact> {
    let fields = Fields::of(node, "impact", IMPACT_FIELDS)?;
    Ok(Impact {
        file_context: attach_position(node),
        value: fields.decode("value")?,
        scoring: fields.keyword(
            "scoring",
            ScoringSystem::from_keyword,
            ScoringSystem::KEYWORDS,
        )?,
        weight: fields.int("weight")?,
        action: fields.keyword("action", Action::from_keyword, Action::KEYWORDS)?,
    })
}

/// Impact scores range from 0 to 100.
fn impact_score(node: &Node) -> DecodeResult<i32> {
    let value = scalar_int(node, "impact")?;
    if !(0..=100).contains(&value) {
        return Err(DecodeError::invalid(
            attach_position(node),
            format!("impact: {value} is outside 0..=100"),
        ));
    }
    Ok(value)
}

impl Decode for ImpactValue {
    fn decode(node: &Node) -> DecodeResult<Self> {
        if node.as_scalar().is_some() {
            return Ok(ImpactValue {
                file_context: attach_position(node),
                value: impact_score(node)?,
            });
        }
        let fields = Fields::of(node, "impact value", IMPACT_VALUE_FIELDS)?;
        let value = match fields.node("value") {
            Some(value) => impact_score(value)?,
            None => 0,
        };
        Ok(ImpactValue {
            file_context: attach_position(node),
            value,
        })
    }
}

impl Decode for Property {
    fn decode(node: &Node) -> DecodeResult<Self> {
        let fields = Fields::of(node, "property", PROPERTY_FIELDS)?;
        Ok(Property {
            file_context: attach_position(node),
            uid: fields.string("uid")?,
            mrn: fields.string("mrn")?,
            title: fields.string("title")?,
            mql: fields.string("mql")?,
        })
    }
}

impl Decode for MigrationGroup {
    fn decode(node: &Node) -> DecodeResult<Self> {
        let fields = Fields::of(node, "migration group", MIGRATION_GROUP_FIELDS)?;
        Ok(MigrationGroup {
            file_context: attach_position(node),
            title: fields.string("title")?,
            stages: fields.list("stages")?,
        })
    }
}

impl Decode for MigrationStage {
    fn decode(node: &Node) -> DecodeResult<Self> {
        let fields = Fields::of(node, "migration stage", MIGRATION_STAGE_FIELDS)?;
        Ok(MigrationStage {
            file_context: attach_position(node),
            title: fields.string("title")?,
            migrations: fields.list("migrations")?,
        })
    }
}

impl Decode for Migration {
    fn decode(node: &Node) -> DecodeResult<Self> {
        let fields = Fields::of(node, "migration", MIGRATION_FIELDS)?;
        Ok(Migration {
            file_context: attach_position(node),
            action: fields.keyword(
                "action",
                MigrationAction::from_keyword,
                MigrationAction::KEYWORDS,
            )?,
            source: fields.decode("source")?,
            destination: fields.decode("destination")?,
        })
    }
}

impl Decode for MigrationRef {
    fn decode(node: &Node) -> DecodeResult<Self> {
        if is_null(node) {
            return Ok(MigrationRef::default());
        }
        let fields = Fields::of(node, "migration reference", MIGRATION_REF_FIELDS)?;
        Ok(MigrationRef {
            file_context: attach_position(node),
            uid: fields.string("uid")?,
            sha256: fields.string("sha256")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::decode::DecodeErrorKind;

    const SSH_BUNDLE: &str = r#"
policies:
  - uid: sshd-policy
    name: SSH Server Policy
    version: 1.0.0
    tags:
      mondoo.com/category: security
    require:
      - provider: os
    groups:
      - title: Configuration
        filters: asset.family.contains("unix")
        checks:
          - uid: sshd-ciphers
queries:
  - uid: sshd-ciphers
    title: Ensure strong ciphers
    impact: 80
    mql: sshd.config.ciphers.none(/cbc/)
    docs:
      desc: Weak ciphers are disabled.
      remediation: Remove CBC ciphers from sshd_config.
"#;

    #[test]
    fn parses_policy_tree_with_positions() {
        let bundle = parse_str(SSH_BUNDLE).unwrap();
        assert_eq!(bundle.policies.len(), 1);
        let policy = &bundle.policies[0];
        assert_eq!(policy.uid, "sshd-policy");
        assert_eq!(policy.file_context.line, 3);
        assert_eq!(policy.file_context.column, 5);
        assert_eq!(policy.require[0].provider, "os");

        let check = &policy.groups[0].checks[0];
        assert_eq!(check.uid, "sshd-ciphers");
        assert!(!check.is_definition_complete());
        assert_eq!(check.file_context.line, 14);
    }

    #[test]
    fn bare_impact_and_remediation_are_expanded() {
        let bundle = parse_str(SSH_BUNDLE).unwrap();
        let query = &bundle.queries[0];
        let impact = query.impact.as_ref().unwrap();
        assert_eq!(impact.value.as_ref().unwrap().value, 80);
        assert!(impact.is_bare());

        let remediation = query.docs.as_ref().unwrap().remediation.as_ref().unwrap();
        assert_eq!(remediation.items.len(), 1);
        assert_eq!(remediation.items[0].id, DEFAULT_REMEDIATION_ID);
    }

    #[test]
    fn bare_filter_gets_empty_key() {
        let bundle = parse_str(SSH_BUNDLE).unwrap();
        let filters = bundle.policies[0].groups[0].filters.as_ref().unwrap();
        assert_eq!(filters.items.len(), 1);
        assert_eq!(filters.items[""].mql, "asset.family.contains(\"unix\")");
    }

    #[test]
    fn filter_shapes_in_order() {
        let strings = parse_str("queries:\n  - uid: query-one\n    filters:\n      - a\n      - b\n").unwrap();
        let filters = strings.queries[0].filters.as_ref().unwrap();
        assert_eq!(filters.items["0"].mql, "a");
        assert_eq!(filters.items["1"].mql, "b");

        let records = parse_str(
            "queries:\n  - uid: query-one\n    filters:\n      - mql: a\n        title: A\n",
        )
        .unwrap();
        let filters = records.queries[0].filters.as_ref().unwrap();
        assert_eq!(filters.items["0"].title, "A");

        let mapping =
            parse_str("queries:\n  - uid: query-one\n    filters:\n      unix:\n        mql: a\n")
                .unwrap();
        let filters = mapping.queries[0].filters.as_ref().unwrap();
        assert_eq!(filters.items["unix"].mql, "a");
    }

    #[test]
    fn empty_filter_sequence_has_no_items() {
        let bundle = parse_str("queries:\n  - uid: query-one\n    filters: []\n").unwrap();
        let filters = bundle.queries[0].filters.as_ref().unwrap();
        assert!(filters.items.is_empty());
    }

    #[test]
    fn full_impact_record() {
        let bundle = parse_str(
            "queries:\n  - uid: query-one\n    impact:\n      value:\n        value: 40\n      weight: 3\n      scoring: worst\n",
        )
        .unwrap();
        let impact = bundle.queries[0].impact.as_ref().unwrap();
        assert_eq!(impact.value.as_ref().unwrap().value, 40);
        assert_eq!(impact.weight, 3);
        assert_eq!(impact.scoring, Some(ScoringSystem::Worst));
        assert!(!impact.is_bare());
    }

    #[test]
    fn impact_out_of_range_is_invalid() {
        let err = parse_str("queries:\n  - uid: query-one\n    impact: 101\n").unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::Invalid);
        assert_eq!(err.position.line, 3);
    }

    #[test]
    fn remediation_items() {
        let bundle = parse_str(
            "queries:\n  - uid: query-one\n    docs:\n      remediation:\n        - id: linux\n          desc: edit the file\n        - id: windows\n          desc: use the registry\n",
        )
        .unwrap();
        let remediation = bundle.queries[0]
            .docs
            .as_ref()
            .unwrap()
            .remediation
            .as_ref()
            .unwrap();
        let ids: Vec<_> = remediation.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["linux", "windows"]);
    }

    #[test]
    fn unknown_top_level_field() {
        let err = parse_str("policies: []\nframeworks: []\n").unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::UnknownField);
        assert!(err.message.contains("frameworks"));
        assert_eq!(err.position.line, 2);
    }

    #[test]
    fn unknown_field_inside_filter_query_surfaces() {
        let err = parse_str(
            "queries:\n  - uid: query-one\n    filters:\n      - mql: a\n        colour: red\n",
        )
        .unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::UnknownField);
    }

    #[test]
    fn malformed_yaml_is_a_syntax_error_at_file_start() {
        let err = parse_str("policies:\n  - uid: [unterminated\n").unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::Syntax);
        assert_eq!(err.position.line, 1);
        assert_eq!(err.position.column, 1);
    }

    #[test]
    fn invalid_utf8_is_a_syntax_error() {
        let err = parse(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::Syntax);
    }

    #[test]
    fn blank_document_is_empty_bundle() {
        let bundle = parse_str("# nothing here\n---\n").unwrap();
        assert_eq!(bundle, Bundle::default());
    }

    #[test]
    fn invalid_keyword_is_rejected() {
        let err = parse_str(
            "migration_groups:\n  - title: m\n    stages:\n      - migrations:\n          - action: rename\n",
        )
        .unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::Invalid);
        assert!(err.message.contains("create, modify, delete"));
    }

    #[test]
    fn variants_keep_their_own_positions() {
        let bundle = parse_str(
            "queries:\n  - uid: parent-query\n    title: Parent\n    variants:\n      - uid: child-query\n",
        )
        .unwrap();
        let variant = &bundle.queries[0].variants[0];
        assert_eq!(variant.uid, "child-query");
        assert_eq!(variant.file_context.line, 5);
        assert_eq!(variant.file_context.column, 9);
    }

    #[test]
    fn parse_file_reports_missing_file() {
        let err = parse_file(Path::new("/nonexistent/bundle.mql.yaml")).unwrap_err();
        assert!(matches!(err, LintError::Io { .. }));
    }
}
