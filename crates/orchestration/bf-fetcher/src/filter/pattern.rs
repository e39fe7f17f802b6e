//! Regex matching against object basenames.

use bf_error::{BfError, Result};
use bf_types::ObjectDescriptor;
use regex::{Regex, RegexBuilder};

use super::Filter;

/// A filter for matching object keys against a regular expression.
///
/// Matches against the filename portion of the key (after the last `/`),
/// not the full key path. The pattern must match at the start of the
/// filename but may stop early, so add `$` to pin the whole name.
///
/// Matching is case-sensitive unless built with [`PatternFilter::case_insensitive`].
///
/// # Example
///
/// ```
/// use bf_fetcher::PatternFilter;
///
/// let filter = PatternFilter::new(r"^db_.*\.sql$").unwrap();
///
/// assert!(filter.matches_key("nightly/db_2024.sql"));
/// assert!(!filter.matches_key("nightly/DB_2024.sql"));
/// assert!(!filter.matches_key("db_2024.sql/notes.txt"));
///
/// let prefix = PatternFilter::new("db_").unwrap();
/// assert!(!prefix.matches_key("nightly/mydb_2024.sql"));
/// ```
#[derive(Debug, Clone)]
pub struct PatternFilter {
    source: String,
    compiled: Regex,
    case_insensitive: bool,
}

impl PatternFilter {
    /// Compile a case-sensitive pattern.
    ///
    /// Returns a configuration error if the pattern is not a valid regex.
    pub fn new(pattern: &str) -> Result<Self> {
        Self::build(pattern, false)
    }

    /// Compile a pattern that ignores ASCII and Unicode case.
    pub fn case_insensitive(pattern: &str) -> Result<Self> {
        Self::build(pattern, true)
    }

    fn build(pattern: &str, case_insensitive: bool) -> Result<Self> {
        let compiled = RegexBuilder::new(&format!("^(?:{pattern})"))
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| BfError::config(format!("Invalid pattern '{pattern}': {e}")))?;

        Ok(Self {
            source: pattern.to_string(),
            compiled,
            case_insensitive,
        })
    }

    /// Check if the basename of a key matches the pattern.
    pub fn matches_key(&self, key: &str) -> bool {
        let filename = key.rsplit('/').next().unwrap_or(key);
        self.compiled.is_match(filename)
    }

    /// Get the original pattern string.
    pub fn pattern(&self) -> &str {
        &self.source
    }

    /// Whether matching ignores case.
    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }
}

impl Filter for PatternFilter {
    fn matches(&self, obj: &ObjectDescriptor) -> bool {
        self.matches_key(&obj.key)
    }

    fn description(&self) -> String {
        if self.case_insensitive {
            format!("pattern(/{}/i)", self.pattern())
        } else {
            format!("pattern(/{}/)", self.pattern())
        }
    }
}
