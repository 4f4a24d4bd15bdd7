//! High-level aggregation queries
//!
//! A [`HighLevelQuery`] describes what the user asked for: one aggregation of
//! one field of one measurement over a time range, optionally grouped into
//! fixed-width time buckets and restricted by a tag filter. It is produced by
//! an upstream query generator and consumed read-only by the planner.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use tsq_planner::query::HighLevelQueryBuilder;
//!
//! let query = HighLevelQueryBuilder::new("cpu", "usage_user")
//!     .aggregation("avg")
//!     .time_range(0, 120)
//!     .group_by(Duration::from_nanos(60))
//!     .with_tag("host", "X")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(query.measurement, "cpu");
//! assert_eq!(query.range().end, 120);
//! ```

use std::fmt;
use std::time::Duration;

use crate::filter::{TagFilter, TagGroup};
use crate::query::error::{PlanError, PlanResult};
use crate::types::{format_timestamp, Timestamp, TimeInterval};

/// Immutable description of one aggregation query
#[derive(Debug, Clone, PartialEq)]
pub struct HighLevelQuery {
    /// Short label for reporting (e.g., "cpu max, rand 8 hosts, 1h by 1m")
    pub human_label: String,

    /// Longer description for reporting
    pub human_description: String,

    /// Caller-assigned identifier
    pub id: i64,

    /// Measurement name (e.g., "cpu")
    pub measurement: String,

    /// Field name (e.g., "usage_user")
    pub field: String,

    /// Aggregation function name, used verbatim (e.g., "avg", "max")
    pub aggregation: String,

    /// Query start (inclusive), nanoseconds
    pub start: Timestamp,

    /// Query end, nanoseconds; bucket bounds are clamped to it
    pub end: Timestamp,

    /// GROUP BY bucket width; zero means the whole range is one bucket
    pub group_by: Duration,

    /// Disjunction of tag groups
    pub tag_filter: TagFilter,
}

impl HighLevelQuery {
    /// The query's own time range
    ///
    /// Fails if `start > end`, which can only happen for a query assembled
    /// field by field rather than through the builder.
    pub fn time_range(&self) -> PlanResult<TimeInterval> {
        TimeInterval::new(self.start, self.end)
    }

    /// The query's own time range without validation
    pub fn range(&self) -> TimeInterval {
        TimeInterval::new_unchecked(self.start, self.end)
    }
}

impl fmt::Display for HighLevelQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ID: {}, HumanLabel: {}, HumanDescription: {}, MeasurementName: {}, FieldName: {}, \
             AggregationType: {}, TimeStart: {}, TimeEnd: {}, GroupByDuration: {:?}, TagSets: {}",
            self.id,
            self.human_label,
            self.human_description,
            self.measurement,
            self.field,
            self.aggregation,
            format_timestamp(self.start),
            format_timestamp(self.end),
            self.group_by,
            self.tag_filter,
        )
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`HighLevelQuery`]
#[derive(Debug, Clone)]
pub struct HighLevelQueryBuilder {
    human_label: String,
    human_description: String,
    id: i64,
    measurement: String,
    field: String,
    aggregation: Option<String>,
    time_range: Option<(Timestamp, Timestamp)>,
    group_by: Duration,
    tag_filter: TagFilter,
}

impl HighLevelQueryBuilder {
    /// Start a query for one field of one measurement
    pub fn new(measurement: &str, field: &str) -> Self {
        Self {
            human_label: String::new(),
            human_description: String::new(),
            id: 0,
            measurement: measurement.to_string(),
            field: field.to_string(),
            aggregation: None,
            time_range: None,
            group_by: Duration::ZERO,
            tag_filter: TagFilter::any(),
        }
    }

    /// Set the reporting label
    pub fn label(mut self, label: &str) -> Self {
        self.human_label = label.to_string();
        self
    }

    /// Set the reporting description
    pub fn description(mut self, description: &str) -> Self {
        self.human_description = description.to_string();
        self
    }

    /// Set the query id
    pub fn id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    /// Set the aggregation function name
    pub fn aggregation(mut self, function: &str) -> Self {
        self.aggregation = Some(function.to_string());
        self
    }

    /// Set the time range in nanoseconds
    pub fn time_range(mut self, start: Timestamp, end: Timestamp) -> Self {
        self.time_range = Some((start, end));
        self
    }

    /// Set the GROUP BY bucket width
    pub fn group_by(mut self, width: Duration) -> Self {
        self.group_by = width;
        self
    }

    /// Add a single-predicate group `key=value` (ORed with other groups)
    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tag_filter = self.tag_filter.or(TagGroup::new().with_tag(key, value));
        self
    }

    /// Add a group of ANDed predicates (ORed with other groups)
    pub fn with_group(mut self, group: TagGroup) -> Self {
        self.tag_filter = self.tag_filter.or(group);
        self
    }

    /// Replace the whole tag filter
    pub fn tag_filter(mut self, filter: TagFilter) -> Self {
        self.tag_filter = filter;
        self
    }

    /// Validate and build the query
    pub fn build(self) -> PlanResult<HighLevelQuery> {
        if self.measurement.is_empty() {
            return Err(PlanError::InvalidQuery("measurement name is empty".to_string()));
        }
        if self.field.is_empty() {
            return Err(PlanError::InvalidQuery("field name is empty".to_string()));
        }

        let aggregation = match self.aggregation {
            Some(a) if !a.is_empty() => a,
            _ => {
                return Err(PlanError::InvalidQuery(
                    "aggregation function is required".to_string(),
                ))
            },
        };

        let (start, end) = self
            .time_range
            .ok_or_else(|| PlanError::InvalidQuery("time range is required".to_string()))?;
        TimeInterval::new(start, end)?;

        Ok(HighLevelQuery {
            human_label: self.human_label,
            human_description: self.human_description,
            id: self.id,
            measurement: self.measurement,
            field: self.field,
            aggregation,
            start,
            end,
            group_by: self.group_by,
            tag_filter: self.tag_filter,
        })
    }
}
