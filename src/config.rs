//! Lint configuration.
//!
//! Configuration is optional. Without a file every rule is enabled and the
//! default set of required policy tags applies.
//!
//! # Example
//!
//! ```
//! use cnspec_lint::config::LintConfig;
//!
//! let config: LintConfig = serde_yaml::from_str("disabled_rules: [query-unassigned]").unwrap();
//! assert!(config.is_disabled("query-unassigned"));
//! assert_eq!(config.required_tags.len(), 2);
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{LintError, Result};

/// Tag keys every policy is expected to carry unless configured otherwise.
pub const DEFAULT_REQUIRED_TAGS: &[&str] = &["mondoo.com/category", "mondoo.com/platform"];

/// Settings that tune rule behavior.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LintConfig {
    /// Tag keys checked by `policy-required-tags-missing`.
    pub required_tags: Vec<String>,

    /// Rule ids whose diagnostics are dropped from the results.
    pub disabled_rules: Vec<String>,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            required_tags: DEFAULT_REQUIRED_TAGS.iter().map(|t| t.to_string()).collect(),
            disabled_rules: Vec::new(),
        }
    }
}

impl LintConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| LintError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|message| LintError::Config {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parse configuration text. An empty document yields the defaults.
    pub fn parse(content: &str) -> std::result::Result<Self, String> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    }

    /// Whether diagnostics of the given rule are suppressed.
    pub fn is_disabled(&self, rule_id: &str) -> bool {
        self.disabled_rules.iter().any(|id| id == rule_id)
    }
}
