//! Per-bucket results
//!
//! The execution layer produces one [`BucketResult`] per plan bucket. Its
//! shape follows the plan's bucket structure, so it is defined alongside it.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::TimeInterval;

/// An aggregate value for one bucket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketResult {
    /// Bucket the value belongs to
    pub interval: TimeInterval,

    /// Aggregated value
    pub value: f64,
}

impl BucketResult {
    /// Create a new result
    pub fn new(interval: TimeInterval, value: f64) -> Self {
        Self { interval, value }
    }

    /// Order by bucket; ties are impossible for results of one plan
    pub fn cmp_by_interval(&self, other: &Self) -> Ordering {
        self.interval.cmp(&other.interval)
    }
}

impl fmt::Display for BucketResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.interval, self.value)
    }
}
