//! GROUP BY time bucketing
//!
//! Splits a query range into the ordered, gap-free, non-overlapping buckets
//! implied by a bucket width.
//!
//! Buckets follow InfluxQL's rounded GROUP BY boundaries: bucket edges sit on
//! multiples of the width counted from the Unix epoch, so the first bucket may
//! start before the query and the last may end after it. The un-clamped
//! bucket is the bucket's identity; the planner clamps it to the query range
//! only when binding statement arguments.
//!
//! ```text
//! query:     |----[15 ............................ 100)
//! width 30:  [0, 30) [30, 60) [60, 90) [90, 120)
//! ```
//!
//! A zero width, or a zero-length range, yields exactly one bucket equal to
//! the query range.

use std::time::Duration;

use tracing::warn;

use crate::query::error::{PlanError, PlanResult};
use crate::types::{Timestamp, TimeInterval};

/// Convert a bucket width to nanoseconds, rejecting widths beyond i64
pub fn width_to_nanos(width: Duration) -> PlanResult<i64> {
    i64::try_from(width.as_nanos())
        .map_err(|_| PlanError::TimeOverflow("converting bucket width to nanoseconds"))
}

/// Iterator over the GROUP BY buckets of a range
///
/// All overflow checks happen in [`BucketIterator::try_new`]; iteration itself
/// cannot fail.
#[derive(Debug, Clone)]
pub struct BucketIterator {
    /// Start of the next bucket
    current: Timestamp,

    /// Bucket width in nanoseconds (0 = single bucket)
    width: i64,

    /// Buckets left to yield
    remaining: usize,

    /// The query range, returned verbatim in single-bucket mode
    range: TimeInterval,
}

impl BucketIterator {
    /// Create an iterator over the buckets of `range`
    pub fn try_new(range: TimeInterval, width: Duration) -> PlanResult<Self> {
        if range.start > range.end {
            return Err(PlanError::InvalidTimeRange {
                start: range.start,
                end: range.end,
            });
        }

        let width = width_to_nanos(width)?;

        if width == 0 || range.is_degenerate() {
            return Ok(Self {
                current: range.start,
                width: 0,
                remaining: 1,
                range,
            });
        }

        let aligned_start = range
            .start
            .checked_sub(range.start.rem_euclid(width))
            .ok_or(PlanError::TimeOverflow("aligning the first bucket"))?;

        // Widen to i128 so the count and the final bucket end cannot overflow
        // before they are checked.
        let span = i128::from(range.end) - i128::from(aligned_start);
        let width_wide = i128::from(width);
        let count = (span + width_wide - 1) / width_wide;
        let last_end = i128::from(aligned_start) + count * width_wide;

        if last_end > i128::from(i64::MAX) {
            return Err(PlanError::TimeOverflow("computing the last bucket end"));
        }

        let remaining = usize::try_from(count)
            .map_err(|_| PlanError::TimeOverflow("counting buckets"))?;

        Ok(Self {
            current: aligned_start,
            width,
            remaining,
            range,
        })
    }

    /// Number of buckets not yet yielded
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl Iterator for BucketIterator {
    type Item = TimeInterval;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        if self.width == 0 {
            return Some(self.range);
        }

        // try_new proved the last end fits in i64
        let start = self.current;
        let end = start + self.width;
        self.current = end;

        Some(TimeInterval::new_unchecked(start, end))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for BucketIterator {}

/// Compute every GROUP BY bucket of `range`
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use tsq_planner::bucket::bucket_time_intervals;
/// use tsq_planner::types::TimeInterval;
///
/// let range = TimeInterval::new(0, 100).unwrap();
/// let buckets = bucket_time_intervals(range, Duration::from_nanos(30)).unwrap();
///
/// let starts: Vec<i64> = buckets.iter().map(|b| b.start).collect();
/// assert_eq!(starts, vec![0, 30, 60, 90]);
/// assert_eq!(buckets.last().unwrap().end, 120);
/// ```
pub fn bucket_time_intervals(range: TimeInterval, width: Duration) -> PlanResult<Vec<TimeInterval>> {
    bucket_time_intervals_with_limit(range, width, 0)
}

/// Compute every GROUP BY bucket of `range`, refusing more than `max_buckets`
///
/// A limit of 0 disables the check. A bucket list too large to allocate is
/// reported as [`PlanError::BucketAllocation`].
pub fn bucket_time_intervals_with_limit(
    range: TimeInterval,
    width: Duration,
    max_buckets: usize,
) -> PlanResult<Vec<TimeInterval>> {
    let iter = BucketIterator::try_new(range, width)?;

    if max_buckets > 0 && iter.remaining() > max_buckets {
        warn!(
            buckets = iter.remaining(),
            limit = max_buckets,
            "Rejecting query: bucket count exceeds limit"
        );
        return Err(PlanError::TooManyBuckets {
            count: iter.remaining(),
            limit: max_buckets,
        });
    }

    let mut buckets = Vec::new();
    buckets
        .try_reserve_exact(iter.remaining())
        .map_err(|_| PlanError::BucketAllocation {
            count: iter.remaining(),
        })?;
    buckets.extend(iter);

    Ok(buckets)
}
