//! SARIF output formatter.
//!
//! SARIF (Static Analysis Results Interchange Format) is an OASIS standard
//! for static analysis tools, supported by GitHub, VS Code, and other tools.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Serialize;

use super::LintFormatter;
use crate::lint::{LintDiagnostic, Location, RuleRegistry, Severity};

/// SARIF version we generate.
const SARIF_VERSION: &str = "2.1.0";
const SARIF_SCHEMA: &str = "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json";

const TOOL_NAME: &str = "cnspec";
const TOOL_INFORMATION_URI: &str = "https://cnspec.io";
const SRCROOT: &str = "%SRCROOT%";

/// Characters escaped inside a single URI path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Formats lint output as SARIF.
///
/// Every rule in the registry is described, in registration order, whether
/// or not it produced a result.
pub struct SarifFormatter<'r> {
    registry: &'r RuleRegistry,
    root_dir: Option<PathBuf>,
    tool_version: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifLog {
    #[serde(rename = "$schema")]
    schema: &'static str,
    version: &'static str,
    runs: Vec<SarifRun>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRun {
    tool: SarifTool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    original_uri_base_ids: BTreeMap<&'static str, SarifArtifactLocation>,
    results: Vec<SarifResult>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifTool {
    driver: SarifDriver,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifDriver {
    name: &'static str,
    information_uri: &'static str,
    version: String,
    rules: Vec<SarifRule>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRule {
    id: String,
    name: String,
    short_description: SarifMessage,
    default_configuration: SarifConfiguration,
}

#[derive(Serialize)]
struct SarifConfiguration {
    level: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifResult {
    rule_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    rule_index: Option<usize>,
    level: &'static str,
    message: SarifMessage,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    locations: Vec<SarifLocation>,
}

#[derive(Serialize)]
struct SarifMessage {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifLocation {
    physical_location: SarifPhysicalLocation,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifPhysicalLocation {
    artifact_location: SarifArtifactLocation,
    region: SarifRegion,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifArtifactLocation {
    uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    uri_base_id: Option<&'static str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRegion {
    start_line: usize,
    start_column: usize,
}

impl<'r> SarifFormatter<'r> {
    /// Create a new SARIF formatter describing the rules of `registry`.
    pub fn new(registry: &'r RuleRegistry) -> Self {
        Self {
            registry,
            root_dir: None,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Emit artifact locations relative to `root_dir`.
    pub fn with_root_dir(mut self, root_dir: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(root_dir.into());
        self
    }

    fn severity_to_level(severity: Severity) -> &'static str {
        match severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
            Severity::None => "none",
        }
    }

    fn artifact_location(&self, file: &Path) -> SarifArtifactLocation {
        let relative = self
            .root_dir
            .as_deref()
            .and_then(|root| file.strip_prefix(root).ok())
            .and_then(relative_uri);
        match relative {
            Some(uri) => SarifArtifactLocation {
                uri,
                uri_base_id: Some(SRCROOT),
            },
            None => SarifArtifactLocation {
                uri: file_uri(file),
                uri_base_id: None,
            },
        }
    }

    fn location(&self, location: &Location) -> SarifLocation {
        SarifLocation {
            physical_location: SarifPhysicalLocation {
                artifact_location: self.artifact_location(&location.file),
                region: SarifRegion {
                    start_line: location.line,
                    start_column: location.column,
                },
            },
        }
    }
}

/// Forward-slash URI for a relative path; `None` if it escapes the root.
fn relative_uri(path: &Path) -> Option<String> {
    let mut segments = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(segment) => segments.push(encode_segment(&segment.to_string_lossy())),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/"))
}

fn file_uri(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let segments: Vec<String> = absolute
        .components()
        .filter_map(|component| match component {
            Component::Prefix(prefix) => Some(prefix.as_os_str().to_string_lossy().into_owned()),
            Component::Normal(segment) => Some(encode_segment(&segment.to_string_lossy())),
            Component::ParentDir => Some("..".to_string()),
            Component::RootDir | Component::CurDir => None,
        })
        .collect();
    format!("file:///{}", segments.join("/"))
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

impl LintFormatter for SarifFormatter<'_> {
    fn format<W: Write + ?Sized>(
        &self,
        diagnostics: &[LintDiagnostic],
        writer: &mut W,
    ) -> std::io::Result<()> {
        let rules: Vec<_> = self
            .registry
            .iter()
            .map(|rule| SarifRule {
                id: rule.id().to_string(),
                name: rule.name().to_string(),
                short_description: SarifMessage {
                    text: rule.description().to_string(),
                },
                default_configuration: SarifConfiguration {
                    level: Self::severity_to_level(rule.default_severity()),
                },
            })
            .collect();

        let results: Vec<_> = diagnostics
            .iter()
            .map(|d| SarifResult {
                rule_id: d.rule_id.to_string(),
                rule_index: self.registry.index_of(&d.rule_id),
                level: Self::severity_to_level(d.severity),
                message: SarifMessage {
                    text: d.message.clone(),
                },
                locations: d.locations.iter().map(|l| self.location(l)).collect(),
            })
            .collect();

        let mut original_uri_base_ids = BTreeMap::new();
        if let Some(root) = &self.root_dir {
            let mut uri = file_uri(root);
            if !uri.ends_with('/') {
                uri.push('/');
            }
            original_uri_base_ids.insert(
                SRCROOT,
                SarifArtifactLocation {
                    uri,
                    uri_base_id: None,
                },
            );
        }

        let log = SarifLog {
            schema: SARIF_SCHEMA,
            version: SARIF_VERSION,
            runs: vec![SarifRun {
                tool: SarifTool {
                    driver: SarifDriver {
                        name: TOOL_NAME,
                        information_uri: TOOL_INFORMATION_URI,
                        version: self.tool_version.clone(),
                        rules,
                    },
                },
                original_uri_base_ids,
                results,
            }],
        };

        serde_json::to_writer_pretty(&mut *writer, &log).map_err(std::io::Error::other)?;
        writeln!(writer)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lint::RuleId;

    fn render(formatter: &SarifFormatter<'_>, diagnostics: &[LintDiagnostic]) -> serde_json::Value {
        let mut output = Vec::new();
        formatter.format(diagnostics, &mut output).unwrap();
        serde_json::from_slice(&output).unwrap()
    }

    fn policy_uid_error(file: &str) -> LintDiagnostic {
        LintDiagnostic::new(RuleId::new("policy-uid"), Severity::Error, "Policy has no uid")
            .with_location(Location::new(file, 3, 5))
    }

    #[test]
    fn produces_valid_sarif() {
        let formatter = SarifFormatter::new(RuleRegistry::builtin());
        let parsed = render(&formatter, &[policy_uid_error("/work/bundle.mql.yaml")]);

        assert_eq!(parsed["version"], "2.1.0");
        assert!(parsed["runs"].is_array());
        let driver = &parsed["runs"][0]["tool"]["driver"];
        assert_eq!(driver["name"], "cnspec");
        assert_eq!(driver["informationUri"], "https://cnspec.io");
        assert_eq!(driver["version"], env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn maps_severity_to_sarif_level() {
        assert_eq!(SarifFormatter::severity_to_level(Severity::Error), "error");
        assert_eq!(SarifFormatter::severity_to_level(Severity::Warning), "warning");
        assert_eq!(SarifFormatter::severity_to_level(Severity::Note), "note");
        assert_eq!(SarifFormatter::severity_to_level(Severity::None), "none");
    }

    #[test]
    fn describes_every_registered_rule_in_order() {
        let registry = RuleRegistry::builtin();
        let parsed = render(&SarifFormatter::new(registry), &[]);

        let rules = parsed["runs"][0]["tool"]["driver"]["rules"].as_array().unwrap();
        assert_eq!(rules.len(), registry.len());
        let expected: Vec<String> = registry.iter().map(|r| r.id().to_string()).collect();
        let actual: Vec<&str> = rules.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(actual, expected);
        assert_eq!(rules[0]["defaultConfiguration"]["level"], "error");
        assert!(rules[0]["shortDescription"]["text"].is_string());
    }

    #[test]
    fn rule_index_points_at_descriptor() {
        let registry = RuleRegistry::builtin();
        let parsed = render(&SarifFormatter::new(registry), &[policy_uid_error("/w/b.yaml")]);

        let result = &parsed["runs"][0]["results"][0];
        let index = result["ruleIndex"].as_u64().unwrap() as usize;
        assert_eq!(parsed["runs"][0]["tool"]["driver"]["rules"][index]["id"], "policy-uid");
        assert_eq!(result["ruleId"], "policy-uid");
        assert_eq!(result["level"], "error");
    }

    #[test]
    fn locations_relative_to_root_dir() {
        let formatter = SarifFormatter::new(RuleRegistry::builtin()).with_root_dir("/work");
        let parsed = render(&formatter, &[policy_uid_error("/work/policies/ssh.mql.yaml")]);

        let run = &parsed["runs"][0];
        let physical = &run["results"][0]["locations"][0]["physicalLocation"];
        assert_eq!(physical["artifactLocation"]["uri"], "policies/ssh.mql.yaml");
        assert_eq!(physical["artifactLocation"]["uriBaseId"], "%SRCROOT%");
        assert_eq!(physical["region"]["startLine"], 3);
        assert_eq!(physical["region"]["startColumn"], 5);
        assert_eq!(run["originalUriBaseIds"]["%SRCROOT%"]["uri"], "file:///work/");
    }

    #[test]
    fn locations_outside_root_use_file_uri() {
        let formatter = SarifFormatter::new(RuleRegistry::builtin()).with_root_dir("/work");
        let parsed = render(&formatter, &[policy_uid_error("/elsewhere/my bundle.yaml")]);

        let artifact =
            &parsed["runs"][0]["results"][0]["locations"][0]["physicalLocation"]["artifactLocation"];
        assert_eq!(artifact["uri"], "file:///elsewhere/my%20bundle.yaml");
        assert!(artifact["uriBaseId"].is_null());
    }

    #[test]
    fn reserved_and_non_ascii_characters_are_escaped() {
        let formatter = SarifFormatter::new(RuleRegistry::builtin()).with_root_dir("/work");
        let parsed = render(
            &formatter,
            &[
                policy_uid_error("/elsewhere/a#b?c ü.yaml"),
                policy_uid_error("/work/dir #1/ü.yaml"),
            ],
        );

        let results = &parsed["runs"][0]["results"];
        let uri = |i: usize| {
            results[i]["locations"][0]["physicalLocation"]["artifactLocation"]["uri"].clone()
        };
        assert_eq!(uri(0), "file:///elsewhere/a%23b%3Fc%20%C3%BC.yaml");
        assert_eq!(uri(1), "dir%20%231/%C3%BC.yaml");
    }

    #[test]
    fn one_physical_location_per_location() {
        let diagnostic = LintDiagnostic::new(
            RuleId::new("bundle-compile-error"),
            Severity::Error,
            "cannot compile",
        )
        .with_location(Location::file_start("/work/a.yaml"))
        .with_location(Location::file_start("/work/b.yaml"));
        let formatter = SarifFormatter::new(RuleRegistry::builtin()).with_root_dir("/work");
        let parsed = render(&formatter, &[diagnostic]);

        let locations = parsed["runs"][0]["results"][0]["locations"].as_array().unwrap();
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[1]["physicalLocation"]["artifactLocation"]["uri"], "b.yaml");
    }
}
