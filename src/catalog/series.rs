//! Physical series known to the catalog

use serde::{Deserialize, Serialize};

use crate::filter::TagFilter;
use crate::types::{TagSet, TimeInterval};

/// A previously registered physical series
///
/// Immutable once registered. The planner reads the table name, the row
/// identifier and the validity window; the four `matches_*` predicates decide
/// whether the series takes part in a query at all and in which buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series {
    /// Storage table holding this series' rows
    pub table: String,

    /// Opaque row / series identifier bound into statements
    pub id: String,

    /// Measurement name (e.g., "cpu")
    pub measurement: String,

    /// Field name (e.g., "usage_user")
    pub field: String,

    /// Tag set
    pub tags: TagSet,

    /// Window over which the series is known to hold data
    pub valid: TimeInterval,
}

impl Series {
    /// Create a new series
    pub fn new(
        table: impl Into<String>,
        id: impl Into<String>,
        measurement: impl Into<String>,
        field: impl Into<String>,
        tags: TagSet,
        valid: TimeInterval,
    ) -> Self {
        Self {
            table: table.into(),
            id: id.into(),
            measurement: measurement.into(),
            field: field.into(),
            tags,
            valid,
        }
    }

    /// Exact match on measurement name
    #[inline]
    pub fn matches_measurement_name(&self, name: &str) -> bool {
        self.measurement == name
    }

    /// Exact match on field name
    #[inline]
    pub fn matches_field_name(&self, name: &str) -> bool {
        self.field == name
    }

    /// OR-of-ANDs tag filter; an empty filter always matches
    #[inline]
    pub fn matches_tag_sets(&self, filter: &TagFilter) -> bool {
        filter.matches(&self.tags)
    }

    /// True when the validity window overlaps `interval`
    #[inline]
    pub fn matches_time_interval(&self, interval: &TimeInterval) -> bool {
        self.valid.overlaps(interval)
    }
}
