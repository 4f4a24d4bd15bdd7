//! Tag filters in disjunctive normal form
//!
//! A query's tag filter is an ordered list of groups. Predicates inside a
//! group are ANDed; the groups themselves are ORed:
//!
//! ```text
//! [{a=1, b=2}, {c=3}]   ==   (a=1 AND b=2) OR (c=3)
//! ```
//!
//! An empty filter (no groups) matches every tag set.
//!
//! # Example
//!
//! ```rust
//! use tsq_planner::filter::{TagFilter, TagGroup};
//! use tsq_planner::types::TagSet;
//!
//! let filter = TagFilter::from_groups(vec![
//!     TagGroup::parse(&["a=1", "b=2"]).unwrap(),
//!     TagGroup::parse(&["c=3"]).unwrap(),
//! ]);
//!
//! assert!(filter.matches(&TagSet::from_pairs(&[("c", "3"), ("d", "9")])));
//! assert!(!filter.matches(&TagSet::from_pairs(&[("a", "1")])));
//! ```

use std::fmt;
use std::str::FromStr;

use regex::Regex;

use crate::query::error::PlanError;
use crate::types::TagSet;

// ============================================================================
// Tag Predicate
// ============================================================================

/// A single test against one tag key
#[derive(Debug, Clone)]
pub enum TagPredicate {
    /// Tag must exist with exactly this value
    Equal {
        /// Tag key
        key: String,
        /// Required value
        value: String,
    },

    /// Tag must be absent or carry a different value
    NotEqual {
        /// Tag key
        key: String,
        /// Excluded value
        value: String,
    },

    /// Tag key must exist with any value
    Exists {
        /// Tag key
        key: String,
    },

    /// Tag value must start with a prefix
    Prefix {
        /// Tag key
        key: String,
        /// Required prefix
        prefix: String,
    },

    /// Tag value must match a regex (compiled at construction)
    Regex {
        /// Tag key
        key: String,
        /// Compiled pattern
        pattern: Regex,
    },
}

impl TagPredicate {
    /// Exact `key=value` predicate
    pub fn equal(key: impl Into<String>, value: impl Into<String>) -> Self {
        TagPredicate::Equal {
            key: key.into(),
            value: value.into(),
        }
    }

    /// `key!=value` predicate
    pub fn not_equal(key: impl Into<String>, value: impl Into<String>) -> Self {
        TagPredicate::NotEqual {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Key-presence predicate
    pub fn exists(key: impl Into<String>) -> Self {
        TagPredicate::Exists { key: key.into() }
    }

    /// Value prefix predicate
    pub fn prefix(key: impl Into<String>, prefix: impl Into<String>) -> Self {
        TagPredicate::Prefix {
            key: key.into(),
            prefix: prefix.into(),
        }
    }

    /// Regex predicate; fails if the pattern does not compile
    pub fn regex(key: impl Into<String>, pattern: &str) -> Result<Self, PlanError> {
        let pattern = Regex::new(pattern)
            .map_err(|e| PlanError::InvalidTagPredicate(format!("bad regex {:?}: {}", pattern, e)))?;
        Ok(TagPredicate::Regex {
            key: key.into(),
            pattern,
        })
    }

    /// Tag key this predicate inspects
    pub fn key(&self) -> &str {
        match self {
            TagPredicate::Equal { key, .. }
            | TagPredicate::NotEqual { key, .. }
            | TagPredicate::Exists { key }
            | TagPredicate::Prefix { key, .. }
            | TagPredicate::Regex { key, .. } => key,
        }
    }

    /// Test a tag set against this predicate
    pub fn matches(&self, tags: &TagSet) -> bool {
        match self {
            TagPredicate::Equal { key, value } => tags.get(key) == Some(value),
            TagPredicate::NotEqual { key, value } => tags.get(key) != Some(value),
            TagPredicate::Exists { key } => tags.contains_key(key),
            TagPredicate::Prefix { key, prefix } => tags
                .get(key)
                .is_some_and(|v| v.starts_with(prefix.as_str())),
            TagPredicate::Regex { key, pattern } => {
                tags.get(key).is_some_and(|v| pattern.is_match(v))
            },
        }
    }
}

impl PartialEq for TagPredicate {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                TagPredicate::Equal { key: k1, value: v1 },
                TagPredicate::Equal { key: k2, value: v2 },
            )
            | (
                TagPredicate::NotEqual { key: k1, value: v1 },
                TagPredicate::NotEqual { key: k2, value: v2 },
            )
            | (
                TagPredicate::Prefix {
                    key: k1,
                    prefix: v1,
                },
                TagPredicate::Prefix {
                    key: k2,
                    prefix: v2,
                },
            ) => k1 == k2 && v1 == v2,
            (TagPredicate::Exists { key: k1 }, TagPredicate::Exists { key: k2 }) => k1 == k2,
            (
                TagPredicate::Regex {
                    key: k1,
                    pattern: p1,
                },
                TagPredicate::Regex {
                    key: k2,
                    pattern: p2,
                },
            ) => k1 == k2 && p1.as_str() == p2.as_str(),
            _ => false,
        }
    }
}

impl fmt::Display for TagPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagPredicate::Equal { key, value } => write!(f, "{}={}", key, value),
            TagPredicate::NotEqual { key, value } => write!(f, "{}!={}", key, value),
            TagPredicate::Exists { key } => write!(f, "{}", key),
            TagPredicate::Prefix { key, prefix } => write!(f, "{}^={}", key, prefix),
            TagPredicate::Regex { key, pattern } => write!(f, "{}=~{}", key, pattern.as_str()),
        }
    }
}

/// Parses `k=v`, `k!=v`, `k=~pattern`, `k^=prefix` and a bare `k`
///
/// Operators are recognised at their first occurrence, so values may contain
/// `=` (e.g. `query=a=b` is key `query`, value `a=b`).
impl FromStr for TagPredicate {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(pos) = s.find(['=', '!', '^']) else {
            return non_empty_key(s, s).map(TagPredicate::exists);
        };

        let (key, rest) = s.split_at(pos);
        let key = non_empty_key(key, s)?;

        if let Some(value) = rest.strip_prefix("!=") {
            Ok(TagPredicate::not_equal(key, value))
        } else if let Some(prefix) = rest.strip_prefix("^=") {
            Ok(TagPredicate::prefix(key, prefix))
        } else if let Some(pattern) = rest.strip_prefix("=~") {
            TagPredicate::regex(key, pattern)
        } else if let Some(value) = rest.strip_prefix('=') {
            Ok(TagPredicate::equal(key, value))
        } else {
            Err(PlanError::InvalidTagPredicate(format!(
                "unrecognised operator in {:?}",
                s
            )))
        }
    }
}

fn non_empty_key<'a>(key: &'a str, original: &str) -> Result<&'a str, PlanError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(PlanError::InvalidTagPredicate(format!(
            "missing tag key in {:?}",
            original
        )));
    }
    Ok(key)
}

// ============================================================================
// Tag Group (AND)
// ============================================================================

/// Conjunction of tag predicates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagGroup {
    predicates: Vec<TagPredicate>,
}

impl TagGroup {
    /// Create an empty group (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from predicates
    pub fn from_predicates(predicates: Vec<TagPredicate>) -> Self {
        Self { predicates }
    }

    /// Parse every entry with [`TagPredicate::from_str`]
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self, PlanError> {
        let predicates = entries
            .iter()
            .map(|e| e.as_ref().parse())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { predicates })
    }

    /// Add a predicate
    pub fn with(mut self, predicate: TagPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Add an exact `key=value` predicate
    pub fn with_tag(self, key: &str, value: &str) -> Self {
        self.with(TagPredicate::equal(key, value))
    }

    /// Predicates in this group
    pub fn predicates(&self) -> &[TagPredicate] {
        &self.predicates
    }

    /// True when every predicate holds
    pub fn matches(&self, tags: &TagSet) -> bool {
        self.predicates.iter().all(|p| p.matches(tags))
    }
}

impl fmt::Display for TagGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.predicates.iter().map(|p| p.to_string()).collect();
        write!(f, "{{{}}}", parts.join(","))
    }
}

// ============================================================================
// Tag Filter (OR of groups)
// ============================================================================

/// Disjunction of tag groups
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagFilter {
    groups: Vec<TagGroup>,
}

impl TagFilter {
    /// Filter that matches every tag set
    pub fn any() -> Self {
        Self::default()
    }

    /// Create from groups
    pub fn from_groups(groups: Vec<TagGroup>) -> Self {
        Self { groups }
    }

    /// Parse a list of string groups, e.g. `[["a=1", "b=2"], ["c=3"]]`
    pub fn parse<S: AsRef<str>>(groups: &[Vec<S>]) -> Result<Self, PlanError> {
        let groups = groups
            .iter()
            .map(|g| TagGroup::parse(g))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { groups })
    }

    /// Append a group
    pub fn or(mut self, group: TagGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Groups in this filter
    pub fn groups(&self) -> &[TagGroup] {
        &self.groups
    }

    /// True when there are no groups
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// True when the filter is empty or at least one group fully matches
    pub fn matches(&self, tags: &TagSet) -> bool {
        self.groups.is_empty() || self.groups.iter().any(|g| g.matches(tags))
    }
}

impl fmt::Display for TagFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.groups.iter().map(|g| g.to_string()).collect();
        write!(f, "[{}]", parts.join(" OR "))
    }
}
