//! Whole-bundle compilation gate.
//!
//! The linter runs a compiler over the union of every successfully parsed
//! file. A failure is reported once, against every input file.

use std::collections::HashSet;

use thiserror::Error;

use super::schema::{Bundle, Filters, Mquery, Policy};

/// Compilation failure for a bundle union.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CompileError {
    pub message: String,
}

impl CompileError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Compiles a bundle and reports the first problem found.
pub trait MqlCompiler: Send + Sync {
    fn compile(&self, bundle: &Bundle) -> Result<(), CompileError>;
}

/// Built-in compiler.
///
/// Resolves policy references across files and checks that every MQL
/// expression is lexically well formed.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundleCompiler;

impl MqlCompiler for BundleCompiler {
    fn compile(&self, bundle: &Bundle) -> Result<(), CompileError> {
        let policy_uids = unique_uids(bundle.policies.iter().map(|p| p.uid.as_str()), "policy")?;
        unique_uids(bundle.queries.iter().map(|q| q.uid.as_str()), "query")?;

        for policy in &bundle.policies {
            check_policy(policy, &policy_uids)?;
        }
        for query in &bundle.queries {
            check_query(query)?;
        }
        for prop in &bundle.props {
            check_mql(&prop.mql).map_err(|e| {
                CompileError::new(format!("property `{}`: {e}", display_uid(&prop.uid)))
            })?;
        }
        Ok(())
    }
}

impl Bundle {
    /// Merge several bundles into one.
    ///
    /// Within each bundle only the first definition of a UID is kept, so
    /// duplicates that the per-file rules already report do not resurface.
    /// Definitions repeated across bundles are kept for the compiler to see.
    pub fn union<'a>(bundles: impl IntoIterator<Item = &'a Bundle>) -> Bundle {
        let mut merged = Bundle::default();
        for bundle in bundles {
            if merged.owner_mrn.is_empty() {
                merged.owner_mrn = bundle.owner_mrn.clone();
            }
            if merged.docs.is_none() {
                merged.docs = bundle.docs.clone();
            }

            let mut seen = HashSet::new();
            merged.policies.extend(
                bundle
                    .policies
                    .iter()
                    .filter(|p| p.uid.is_empty() || seen.insert(p.uid.as_str()))
                    .cloned(),
            );

            let mut seen = HashSet::new();
            merged.queries.extend(
                bundle
                    .queries
                    .iter()
                    .filter(|q| q.uid.is_empty() || seen.insert(q.uid.as_str()))
                    .cloned(),
            );

            merged.props.extend(bundle.props.iter().cloned());
            merged
                .migration_groups
                .extend(bundle.migration_groups.iter().cloned());
        }
        merged
    }
}

fn unique_uids<'a>(
    uids: impl Iterator<Item = &'a str>,
    kind: &str,
) -> Result<HashSet<&'a str>, CompileError> {
    let mut seen = HashSet::new();
    for uid in uids.filter(|uid| !uid.is_empty()) {
        if !seen.insert(uid) {
            return Err(CompileError::new(format!(
                "{kind} uid `{uid}` is defined in more than one file"
            )));
        }
    }
    Ok(seen)
}

fn check_policy(policy: &Policy, policy_uids: &HashSet<&str>) -> Result<(), CompileError> {
    let owner = display_uid(&policy.uid);
    for group in &policy.groups {
        if let Some(filters) = &group.filters {
            check_filters(filters)
                .map_err(|e| CompileError::new(format!("policy `{owner}` filter: {e}")))?;
        }

        for reference in &group.policies {
            match (reference.uid.is_empty(), reference.mrn.is_empty()) {
                (false, false) => {
                    return Err(CompileError::new(format!(
                        "policy `{owner}` references policy `{}` by both uid and mrn",
                        reference.uid
                    )))
                }
                (true, true) => {
                    return Err(CompileError::new(format!(
                        "policy `{owner}` has a policy reference without uid or mrn"
                    )))
                }
                (true, false) if !reference.mrn.starts_with("//") => {
                    return Err(CompileError::new(format!(
                        "policy `{owner}` references invalid mrn `{}`",
                        reference.mrn
                    )))
                }
                (false, true) if !policy_uids.contains(reference.uid.as_str()) => {
                    return Err(CompileError::new(format!(
                        "policy `{owner}` references unknown policy `{}`",
                        reference.uid
                    )))
                }
                _ => {}
            }
        }

        for query in group.checks.iter().chain(&group.queries) {
            check_query(query)?;
        }
    }
    Ok(())
}

fn check_query(query: &Mquery) -> Result<(), CompileError> {
    let uid = display_uid(&query.uid);
    check_mql(&query.mql).map_err(|e| CompileError::new(format!("query `{uid}`: {e}")))?;
    if let Some(filters) = &query.filters {
        check_filters(filters)
            .map_err(|e| CompileError::new(format!("query `{uid}` filter: {e}")))?;
    }
    for variant in &query.variants {
        check_query(variant)?;
    }
    Ok(())
}

fn check_filters(filters: &Filters) -> Result<(), String> {
    filters
        .items
        .values()
        .try_for_each(|filter| check_mql(&filter.mql))
}

fn display_uid(uid: &str) -> &str {
    if uid.is_empty() {
        "<unnamed>"
    } else {
        uid
    }
}

/// Lexical check of an MQL expression: brackets must balance and string
/// literals must be terminated.
pub fn check_mql(mql: &str) -> Result<(), String> {
    let mut stack: Vec<char> = Vec::new();
    let mut chars = mql.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' | '\'' => {
                let quote = c;
                let mut closed = false;
                while let Some(inner) = chars.next() {
                    if inner == '\\' {
                        chars.next();
                    } else if inner == quote {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err("unterminated string literal".to_string());
                }
            }
            '(' | '[' | '{' => stack.push(c),
            ')' | ']' | '}' => {
                let open = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if stack.pop() != Some(open) {
                    return Err(format!("unexpected `{c}`"));
                }
            }
            _ => {}
        }
    }
    match stack.pop() {
        Some(open) => Err(format!("unclosed `{open}`")),
        None => Ok(()),
    }
}
