//! Per-file lint context.
//!
//! [`LintContext::build`] walks a parsed bundle once and records the lookups
//! rules need: UID maps, query usage, variant relations and the embedded
//! query definitions to lint. Every map is file-local.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use super::location::Location;
use super::rule::QueryLintInput;
use crate::bundle::{Bundle, FileContext, Mquery, Policy};
use crate::config::LintConfig;

/// Which list of a policy group a query was assigned through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Usage {
    Check,
    Data,
}

/// Lookups shared by every rule run against one file.
#[derive(Debug)]
pub struct LintContext<'a> {
    /// Absolute path of the file being linted.
    pub file_path: &'a Path,
    pub bundle: &'a Bundle,
    pub config: &'a LintConfig,

    /// First global query defined for each UID.
    pub global_queries_by_uid: HashMap<&'a str, &'a Mquery>,
    /// First policy defined for each UID.
    pub policy_uids_in_file: HashMap<&'a str, &'a Policy>,

    /// UIDs assigned by any policy group, including variants reachable from them.
    pub assigned_query_uids: HashSet<&'a str>,
    pub query_usage_as_check: HashSet<&'a str>,
    pub query_usage_as_data: HashSet<&'a str>,
    /// Every query listed in a policy group's checks or queries, in order.
    pub assignment_sites: Vec<&'a Mquery>,

    /// Variant UID to the UID of the query that lists it.
    pub variant_mapping: HashMap<&'a str, &'a str>,

    /// Query definitions found inside policy groups, in traversal order.
    pub embedded_queries: Vec<QueryLintInput<'a>>,
}

impl<'a> LintContext<'a> {
    pub fn build(file_path: &'a Path, bundle: &'a Bundle, config: &'a LintConfig) -> Self {
        let mut ctx = Self {
            file_path,
            bundle,
            config,
            global_queries_by_uid: HashMap::new(),
            policy_uids_in_file: HashMap::new(),
            assigned_query_uids: HashSet::new(),
            query_usage_as_check: HashSet::new(),
            query_usage_as_data: HashSet::new(),
            assignment_sites: Vec::new(),
            variant_mapping: HashMap::new(),
            embedded_queries: Vec::new(),
        };

        for query in &bundle.queries {
            if !query.uid.is_empty() {
                ctx.global_queries_by_uid.entry(&query.uid).or_insert(query);
            }
        }
        // Variants of global queries; inline variant definitions are embedded.
        for query in &bundle.queries {
            let mut visited = HashSet::new();
            ctx.index_variants(query, &mut visited);
        }

        for policy in &bundle.policies {
            if !policy.uid.is_empty() {
                ctx.policy_uids_in_file.entry(&policy.uid).or_insert(policy);
            }
            for group in &policy.groups {
                for check in &group.checks {
                    ctx.index_assigned(check, Usage::Check);
                }
                for query in &group.queries {
                    ctx.index_assigned(query, Usage::Data);
                }
                for query in group.checks.iter().chain(&group.queries) {
                    let mut visited = HashSet::new();
                    ctx.index_variants(query, &mut visited);
                }
            }
        }

        ctx.close_assigned_over_variants();
        ctx
    }

    /// Location of a record in the current file.
    pub fn location(&self, context: &FileContext) -> Location {
        Location::at(self.file_path, context)
    }

    /// Whether `query` is the first global query with its UID.
    pub fn is_first_global_query(&self, query: &Mquery) -> bool {
        self.global_queries_by_uid
            .get(query.uid.as_str())
            .is_some_and(|first| std::ptr::eq(*first, query))
    }

    /// Whether `policy` is the first policy with its UID.
    pub fn is_first_policy(&self, policy: &Policy) -> bool {
        self.policy_uids_in_file
            .get(policy.uid.as_str())
            .is_some_and(|first| std::ptr::eq(*first, policy))
    }

    fn index_assigned(&mut self, query: &'a Mquery, usage: Usage) {
        self.assignment_sites.push(query);
        if !query.uid.is_empty() {
            self.assigned_query_uids.insert(&query.uid);
            match usage {
                Usage::Check => self.query_usage_as_check.insert(&query.uid),
                Usage::Data => self.query_usage_as_data.insert(&query.uid),
            };
        }
        if query.is_definition_complete() {
            self.embedded_queries.push(QueryLintInput {
                query,
                is_global: false,
                is_variant: false,
            });
        }
    }

    /// Record the variants listed by `parent`, depth first.
    ///
    /// The first parent seen for a UID wins; `visited` stops cycles formed by
    /// inline definitions.
    fn index_variants(&mut self, parent: &'a Mquery, visited: &mut HashSet<*const Mquery>) {
        if !visited.insert(parent as *const Mquery) {
            return;
        }
        for variant in &parent.variants {
            if !variant.uid.is_empty() && !parent.uid.is_empty() {
                self.variant_mapping
                    .entry(&variant.uid)
                    .or_insert(&parent.uid);
            }
            if variant.is_definition_complete() {
                self.embedded_queries.push(QueryLintInput {
                    query: variant,
                    is_global: false,
                    is_variant: true,
                });
                self.index_variants(variant, visited);
            }
        }
    }

    /// Anything reachable through the variants of an assigned query counts as
    /// assigned, including variants defined as global queries.
    fn close_assigned_over_variants(&mut self) {
        let mut pending: Vec<&'a str> = self.assigned_query_uids.iter().copied().collect();
        while let Some(uid) = pending.pop() {
            let Some(query) = self.global_queries_by_uid.get(uid).copied() else {
                continue;
            };
            for variant in &query.variants {
                if !variant.uid.is_empty() && self.assigned_query_uids.insert(&variant.uid) {
                    pending.push(&variant.uid);
                }
            }
        }
        let inline: Vec<&'a str> = self
            .embedded_queries
            .iter()
            .filter(|input| input.is_variant && !input.query.uid.is_empty())
            .map(|input| input.query.uid.as_str())
            .collect();
        self.assigned_query_uids.extend(inline);
    }

    /// Whether a UID is the child of some variant relation.
    pub fn is_variant_uid(&self, uid: &str) -> bool {
        self.variant_mapping.contains_key(uid)
    }
}
