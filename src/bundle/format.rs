//! Canonical YAML serialization of bundles.
//!
//! Records serialize their fields in declaration order and omit anything at
//! its default. Polymorphic fields pick the shortest shape that decodes back
//! to an equal value.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use super::parse::parse;
use super::schema::{Bundle, Filters, Impact, Mquery, Remediation, DEFAULT_REMEDIATION_ID};
use crate::error::{LintError, Result};

/// Serialize a bundle to canonical YAML text.
pub fn format_bundle(bundle: &Bundle) -> Result<String> {
    let text = serde_yaml::to_string(bundle).context("failed to serialize bundle")?;
    Ok(text)
}

/// Reformat a bundle file in place.
///
/// Returns whether the file content changed. The file is written back with
/// mode `0644` on Unix.
pub fn format_file(path: &Path) -> Result<bool> {
    let original = fs::read(path).map_err(|source| LintError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let bundle = parse(&original).map_err(|e| LintError::Parse {
        path: path.to_path_buf(),
        message: format!("{} at {}", e.message, e.position),
    })?;
    let formatted = format_bundle(&bundle)?;
    let changed = formatted.as_bytes() != original.as_slice();

    fs::write(path, &formatted).map_err(|source| LintError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    set_file_mode(path)?;

    tracing::debug!(path = %path.display(), changed, "Formatted bundle");
    Ok(changed)
}

#[cfg(unix)]
fn set_file_mode(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o644)).map_err(|source| {
        LintError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(not(unix))]
fn set_file_mode(_path: &Path) -> Result<()> {
    Ok(())
}

/// A filter that carries nothing but its MQL can be written as a string.
fn is_mql_only(query: &Mquery) -> bool {
    *query
        == Mquery {
            mql: query.mql.clone(),
            ..Default::default()
        }
}

impl Serialize for Filters {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mql_only = self.items.values().all(is_mql_only);
        // bare strings decode under key "", sequences under "0", "1", ...
        let bare = self.items.len() == 1 && self.items.keys().all(String::is_empty);
        let positional = self
            .items
            .keys()
            .enumerate()
            .all(|(i, key)| *key == i.to_string());

        if self.items.len() == 1 && mql_only && (bare || positional) {
            if let Some(query) = self.items.values().next() {
                if !query.mql.is_empty() {
                    return serializer.serialize_str(&query.mql);
                }
            }
        }

        if bare || positional {
            let mut seq = serializer.serialize_seq(Some(self.items.len()))?;
            for query in self.items.values() {
                if mql_only {
                    seq.serialize_element(&query.mql)?;
                } else {
                    seq.serialize_element(query)?;
                }
            }
            seq.end()
        } else {
            let mut map = serializer.serialize_map(Some(self.items.len()))?;
            for (key, query) in &self.items {
                map.serialize_entry(key, query)?;
            }
            map.end()
        }
    }
}

impl Serialize for Impact {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if self.is_bare() {
            if let Some(value) = &self.value {
                return serializer.serialize_i32(value.value);
            }
        }

        let mut map = serializer.serialize_map(None)?;
        if let Some(value) = &self.value {
            map.serialize_entry("value", value)?;
        }
        if let Some(scoring) = &self.scoring {
            map.serialize_entry("scoring", scoring)?;
        }
        if self.weight != 0 {
            map.serialize_entry("weight", &self.weight)?;
        }
        if let Some(action) = &self.action {
            map.serialize_entry("action", action)?;
        }
        map.end()
    }
}

impl Serialize for Remediation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if let [only] = self.items.as_slice() {
            if only.id == DEFAULT_REMEDIATION_ID {
                return serializer.serialize_str(&only.desc);
            }
        }
        let mut seq = serializer.serialize_seq(Some(self.items.len()))?;
        for item in &self.items {
            seq.serialize_element(item)?;
        }
        seq.end()
    }
}
