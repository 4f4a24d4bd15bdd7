//! Planning error types
//!
//! Every fault detected while bucketing a time range, parsing tag predicates
//! or assembling a query plan is reported as a [`PlanError`]. A query that
//! matches zero series is not an error: it yields a plan whose buckets are all
//! empty.

use thiserror::Error;

use crate::types::{Timestamp, TimeInterval};

/// Errors that can occur during query planning
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// Time range with end before start
    #[error("Invalid time range: start {start} > end {end}")]
    InvalidTimeRange {
        /// Start timestamp
        start: Timestamp,
        /// End timestamp
        end: Timestamp,
    },

    /// Integer overflow in time arithmetic
    #[error("Time arithmetic overflow while {0}")]
    TimeOverflow(&'static str),

    /// Bucket count exceeds the configured limit
    #[error("Query produces too many buckets: {count} (limit: {limit})")]
    TooManyBuckets {
        /// Number of buckets the range would produce (at least)
        count: usize,
        /// Maximum allowed
        limit: usize,
    },

    /// Bucket list could not be allocated
    #[error("Cannot allocate {count} buckets")]
    BucketAllocation {
        /// Number of buckets requested
        count: usize,
    },

    /// Two buckets share the same key
    #[error("Duplicate bucket {0} in query plan")]
    BucketCollision(TimeInterval),

    /// Bucket with start after end
    #[error("Malformed bucket: start {} > end {}", .0.start, .0.end)]
    MalformedBucket(TimeInterval),

    /// Two distinct buckets cover the same instant
    #[error("Overlapping buckets {first} and {second} in query plan")]
    OverlappingBuckets {
        /// Earlier bucket
        first: TimeInterval,
        /// Later bucket
        second: TimeInterval,
    },

    /// Tag predicate could not be parsed or compiled
    #[error("Invalid tag predicate: {0}")]
    InvalidTagPredicate(String),

    /// Query is missing a required component
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl PlanError {
    /// Returns true for malformed requests, false for internal assembly faults
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            PlanError::InvalidTimeRange { .. }
                | PlanError::TimeOverflow(_)
                | PlanError::TooManyBuckets { .. }
                | PlanError::BucketAllocation { .. }
                | PlanError::InvalidTagPredicate(_)
                | PlanError::InvalidQuery(_)
        )
    }
}

/// Result type alias for planning operations
pub type PlanResult<T> = std::result::Result<T, PlanError>;
