//! Repository and tag name filters.
//!
//! The filter mode is chosen once, when the configuration is built:
//!
//! - empty text matches every name
//! - text containing a comma is a list of prefixes (`svc-a, svc-b`)
//! - anything else is a regular expression matched anywhere in the name
//!
//! Tag filters are always regular expressions.

use regex::Regex;

use crate::error::Result;

/// Separator that switches a repository filter into prefix-list mode.
const PREFIX_SEPARATOR: char = ',';

/// A compiled name filter.
#[derive(Debug, Clone)]
pub enum NameFilter {
    /// Every name matches.
    MatchAll,
    /// Name must start with at least one of the prefixes.
    PrefixList(Vec<String>),
    /// Name must contain a match for the pattern.
    Pattern(Regex),
}

impl NameFilter {
    /// Build a repository filter.
    ///
    /// A comma anywhere in `text` selects prefix-list mode. Each prefix is
    /// trimmed and empty entries are dropped.
    pub fn for_repositories(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(NameFilter::MatchAll);
        }

        if text.contains(PREFIX_SEPARATOR) {
            let prefixes: Vec<String> = text
                .split(PREFIX_SEPARATOR)
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
            if prefixes.is_empty() {
                return Ok(NameFilter::MatchAll);
            }
            return Ok(NameFilter::PrefixList(prefixes));
        }

        Ok(NameFilter::Pattern(Regex::new(text)?))
    }

    /// Build a tag filter. Always a regular expression unless empty.
    pub fn for_tags(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(NameFilter::MatchAll);
        }
        Ok(NameFilter::Pattern(Regex::new(text)?))
    }

    /// Check whether `name` passes this filter.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NameFilter::MatchAll => true,
            NameFilter::PrefixList(prefixes) => prefixes.iter().any(|p| name.starts_with(p)),
            NameFilter::Pattern(re) => re.is_match(name),
        }
    }

    /// Short description for log lines.
    pub fn describe(&self) -> String {
        match self {
            NameFilter::MatchAll => "all".to_string(),
            NameFilter::PrefixList(prefixes) => format!("prefixes [{}]", prefixes.join(", ")),
            NameFilter::Pattern(re) => format!("pattern /{}/", re.as_str()),
        }
    }
}

/// Check a repository name against raw filter text.
///
/// Malformed patterns never match here; configuration loading reports them.
pub fn matches_repository(name: &str, filter: &str) -> bool {
    NameFilter::for_repositories(filter)
        .map(|f| f.matches(name))
        .unwrap_or(false)
}

/// Check a tag name against raw filter text.
pub fn matches_tag(name: &str, filter: &str) -> bool {
    NameFilter::for_tags(filter)
        .map(|f| f.matches(name))
        .unwrap_or(false)
}
