//! Query plan container
//!
//! Maps every GROUP BY bucket of a query to the low-level statements needed
//! to answer it. The key set always equals the full bucket set: a bucket with
//! no matching series is present with an empty list, so downstream
//! aggregation can report "no data" for it instead of dropping it.

use std::collections::{BTreeMap, BTreeSet};

use crate::query::error::{PlanError, PlanResult};
use crate::query::statement::{AggregationPlacement, LowLevelQuery};
use crate::types::TimeInterval;

/// Bucket → low-level statements
///
/// Buckets iterate in start order. No order is promised within one bucket's
/// statement list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    aggregation: String,
    placement: AggregationPlacement,
    buckets: BTreeMap<TimeInterval, Vec<LowLevelQuery>>,
}

impl QueryPlan {
    /// Assemble a plan, validating the bucket keys
    ///
    /// Fails on a bucket with `start > end`, on a repeated bucket, or on two
    /// buckets that cover the same instant.
    pub fn try_new(
        aggregation: impl Into<String>,
        placement: AggregationPlacement,
        buckets: Vec<(TimeInterval, Vec<LowLevelQuery>)>,
    ) -> PlanResult<Self> {
        let mut map = BTreeMap::new();

        for (interval, queries) in buckets {
            if interval.start > interval.end {
                return Err(PlanError::MalformedBucket(interval));
            }
            if map.insert(interval, queries).is_some() {
                return Err(PlanError::BucketCollision(interval));
            }
        }

        let mut keys = map.keys();
        if let Some(mut prev) = keys.next() {
            for next in keys {
                if prev.overlaps(next) {
                    return Err(PlanError::OverlappingBuckets {
                        first: *prev,
                        second: *next,
                    });
                }
                prev = next;
            }
        }

        Ok(Self {
            aggregation: aggregation.into(),
            placement,
            buckets: map,
        })
    }

    /// Aggregation function name the plan answers
    pub fn aggregation(&self) -> &str {
        &self.aggregation
    }

    /// Where the aggregation is evaluated
    pub fn placement(&self) -> AggregationPlacement {
        self.placement
    }

    /// Iterate over `(bucket, statements)` in bucket start order
    pub fn buckets(&self) -> impl Iterator<Item = (&TimeInterval, &[LowLevelQuery])> + '_ {
        self.buckets.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Iterate over bucket keys in start order
    pub fn intervals(&self) -> impl Iterator<Item = &TimeInterval> + '_ {
        self.buckets.keys()
    }

    /// Statements for one bucket, or `None` if it is not part of the plan
    pub fn queries(&self, interval: &TimeInterval) -> Option<&[LowLevelQuery]> {
        self.buckets.get(interval).map(Vec::as_slice)
    }

    /// Number of buckets
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// True if the plan has no buckets
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total statements across all buckets
    pub fn query_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// True when every bucket is empty (the query matched nothing)
    pub fn has_no_data(&self) -> bool {
        self.buckets.values().all(Vec::is_empty)
    }

    /// Distinct statement texts, for preparing each once before execution
    pub fn distinct_statements(&self) -> BTreeSet<&str> {
        self.buckets
            .values()
            .flatten()
            .map(LowLevelQuery::statement)
            .collect()
    }

    /// Take ownership of the bucket map
    pub fn into_buckets(self) -> BTreeMap<TimeInterval, Vec<LowLevelQuery>> {
        self.buckets
    }
}
