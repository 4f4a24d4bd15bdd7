//! Core data types shared by the bucketer, the catalog and the planner
//!
//! # Key Types
//!
//! - **`Timestamp`**: Unix timestamp in nanoseconds (i64)
//! - **`TimeInterval`**: Half-open time window `[start, end)` used both as a
//!   GROUP BY bucket and as a series validity window
//! - **`TagSet`**: Key-value metadata attached to a series (e.g., host=server1)
//!
//! # Example
//!
//! ```rust
//! use tsq_planner::types::{TagSet, TimeInterval};
//!
//! let bucket = TimeInterval::new(0, 60).unwrap();
//! assert!(bucket.contains(30));
//! assert!(!bucket.contains(60)); // end is exclusive
//!
//! let mut tags = TagSet::new();
//! tags.add("host".to_string(), "server1".to_string());
//! assert_eq!(tags.get("host").map(String::as_str), Some("server1"));
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::query::error::PlanError;

/// Unix timestamp in nanoseconds since epoch
pub type Timestamp = i64;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Render a nanosecond timestamp as RFC 3339 in UTC
///
/// Timestamps outside chrono's representable range fall back to the raw
/// nanosecond count so that debug output never fails.
pub fn format_timestamp(nanos: Timestamp) -> String {
    let secs = nanos.div_euclid(NANOS_PER_SECOND);
    let subsec = nanos.rem_euclid(NANOS_PER_SECOND) as u32;

    match DateTime::<Utc>::from_timestamp(secs, subsec) {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        None => format!("{}ns", nanos),
    }
}

/// Time interval `[start, end)` in nanoseconds
///
/// Equality, hashing and ordering are derived over `(start, end)`, so an
/// interval is usable as a map key by value. Ordering sorts by start first.
///
/// A degenerate interval (`start == end`) is allowed: it is what the bucketer
/// produces for a zero-length query range and it behaves as a single instant
/// when tested for overlap.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "RawInterval")]
pub struct TimeInterval {
    /// Start timestamp (inclusive)
    pub start: Timestamp,

    /// End timestamp (exclusive)
    pub end: Timestamp,
}

impl TimeInterval {
    /// Create a new interval, rejecting `start > end`
    ///
    /// # Example
    ///
    /// ```rust
    /// use tsq_planner::types::TimeInterval;
    ///
    /// assert!(TimeInterval::new(1000, 2000).is_ok());
    /// assert!(TimeInterval::new(1000, 1000).is_ok());
    /// assert!(TimeInterval::new(2000, 1000).is_err());
    /// ```
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self, PlanError> {
        if start > end {
            return Err(PlanError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Create an interval without checking `start <= end`
    ///
    /// Only for inputs already known to be ordered. Plan assembly re-validates
    /// every bucket key, so a malformed interval built this way is reported
    /// there rather than silently accepted.
    pub fn new_unchecked(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    /// True when `start == end`
    pub fn is_degenerate(&self) -> bool {
        self.start == self.end
    }

    /// Check if a timestamp falls within `[start, end)`
    ///
    /// A degenerate interval contains exactly its own instant.
    pub fn contains(&self, timestamp: Timestamp) -> bool {
        if self.is_degenerate() {
            return timestamp == self.start;
        }
        timestamp >= self.start && timestamp < self.end
    }

    /// Check whether two intervals share at least one instant
    ///
    /// Half-open semantics: `[0, 60)` and `[60, 120)` do not overlap. A
    /// degenerate interval overlaps anything that contains its instant.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        match (self.is_degenerate(), other.is_degenerate()) {
            (true, true) => self.start == other.start,
            (true, false) => other.contains(self.start),
            (false, true) => self.contains(other.start),
            (false, false) => self.start < other.end && other.start < self.end,
        }
    }

    /// Clamp this interval to `bounds`
    ///
    /// Start is raised to `bounds.start` and end lowered to `bounds.end`. The
    /// result is never inverted: if the two do not overlap, the result
    /// collapses to a degenerate interval at the nearest bound.
    pub fn clamp_to(&self, bounds: &TimeInterval) -> TimeInterval {
        let start = self.start.max(bounds.start).min(bounds.end);
        let end = self.end.min(bounds.end).max(start);
        TimeInterval { start, end }
    }

    /// Length in nanoseconds, or `None` on overflow
    pub fn duration_nanos(&self) -> Option<i64> {
        self.end.checked_sub(self.start)
    }
}

/// Unvalidated wire form; deserialized intervals go through [`TimeInterval::new`]
#[derive(Deserialize)]
struct RawInterval {
    start: Timestamp,
    end: Timestamp,
}

impl TryFrom<RawInterval> for TimeInterval {
    type Error = PlanError;

    fn try_from(raw: RawInterval) -> Result<Self, Self::Error> {
        TimeInterval::new(raw.start, raw.end)
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {})",
            format_timestamp(self.start),
            format_timestamp(self.end)
        )
    }
}

/// Tag set for a series (key-value metadata)
///
/// # Example
///
/// ```rust
/// use tsq_planner::types::TagSet;
///
/// let tags = TagSet::from_pairs(&[("host", "web-01"), ("dc", "us-east-1")]);
/// assert_eq!(tags.series_key(), "dc=us-east-1,host=web-01");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TagSet {
    /// Key-value pairs representing series dimensions
    pub tags: HashMap<String, String>,
}

impl TagSet {
    /// Create a new empty tag set
    pub fn new() -> Self {
        Self {
            tags: HashMap::new(),
        }
    }

    /// Create from a hashmap
    pub fn from_map(tags: HashMap<String, String>) -> Self {
        Self { tags }
    }

    /// Create from borrowed key-value pairs
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            tags: pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }

    /// Add a tag
    pub fn add(&mut self, key: String, value: String) {
        self.tags.insert(key, value);
    }

    /// Get a tag value
    pub fn get(&self, key: &str) -> Option<&String> {
        self.tags.get(key)
    }

    /// Check whether a tag key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.tags.contains_key(key)
    }

    /// Number of tags
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// True if there are no tags
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Canonical `k=v,k=v` form with keys sorted
    ///
    /// Identical for identical tag sets regardless of insertion order.
    pub fn series_key(&self) -> String {
        let mut pairs: Vec<_> = self.tags.iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        pairs
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.series_key())
    }
}
