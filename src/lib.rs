//! TSQ Planner - Time-bucketed aggregation query planning
//!
//! This library turns a high-level time-series aggregation query into a plan
//! of low-level, parameterized statements:
//! - GROUP BY time bucketing with InfluxQL-compatible boundary clamping
//! - In-memory series catalog with lock-free planning over snapshots
//! - OR-of-ANDs tag filtering with equality, prefix and regex predicates
//! - Stable statement text per (aggregation, table) for prepared reuse
//! - Parallel batch planning
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use tsq_planner::catalog::{Series, SeriesCatalog, SeriesSource};
//! use tsq_planner::query::{HighLevelQueryBuilder, QueryPlanner};
//! use tsq_planner::types::{TagSet, TimeInterval};
//!
//! let catalog = SeriesCatalog::new();
//! catalog.register(Series::new(
//!     "cpu",
//!     "A",
//!     "cpu",
//!     "usage_user",
//!     TagSet::from_pairs(&[("host", "X")]),
//!     TimeInterval::new(0, 200).unwrap(),
//! ));
//!
//! let query = HighLevelQueryBuilder::new("cpu", "usage_user")
//!     .aggregation("avg")
//!     .time_range(0, 120)
//!     .group_by(Duration::from_nanos(60))
//!     .with_tag("host", "X")
//!     .build()
//!     .unwrap();
//!
//! let plan = QueryPlanner::new().plan(&query, &catalog.snapshot()).unwrap();
//! for (bucket, queries) in plan.buckets() {
//!     assert_eq!(queries.len(), 1);
//!     assert!(bucket.end <= 120);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bucket;
pub mod catalog;
pub mod error;
pub mod filter;
pub mod types;

/// Configuration management with TOML support
pub mod config;

/// Query planning: high-level queries, plans and low-level statements
pub mod query;

pub use catalog::{CatalogSnapshot, Series, SeriesCatalog, SeriesSource};
pub use config::PlannerConfig;
pub use error::{Error, Result};
pub use filter::{TagFilter, TagGroup, TagPredicate};
pub use query::{
    HighLevelQuery, HighLevelQueryBuilder, LowLevelQuery, PlanError, QueryPlan, QueryPlanner,
};
pub use types::{TagSet, TimeInterval, Timestamp};
