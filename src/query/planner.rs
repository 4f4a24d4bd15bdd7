//! Query planner
//!
//! Turns one [`HighLevelQuery`] plus a catalog snapshot into a [`QueryPlan`]:
//! the GROUP BY buckets of the query, each mapped to one low-level statement
//! per series that overlaps it.
//!
//! # Planning Phases
//!
//! ```text
//! HighLevelQuery          CatalogSnapshot
//!      │                        │
//!      ▼                        ▼
//! ┌─────────────┐      ┌─────────────────┐
//! │   Bucket    │      │  Filter series  │  measurement → field → tags
//! └──────┬──────┘      └────────┬────────┘
//!        │                      │
//!        └──────────┬───────────┘
//!                   ▼
//!          ┌─────────────────┐
//!          │  Overlap test   │  per bucket, against series validity window
//!          └────────┬────────┘
//!                   ▼
//!          ┌─────────────────┐
//!          │  Bind statement │  (row id, clamped start, clamped end)
//!          └────────┬────────┘
//!                   ▼
//!               QueryPlan
//! ```
//!
//! Every bucket is present in the plan before matching starts, so a bucket no
//! series overlaps stays in the plan with an empty statement list.
//!
//! # Bound Clamping
//!
//! Buckets are aligned to multiples of the GROUP BY width, so the first and
//! last bucket can reach outside the query range. With
//! `clamp_to_query_range` enabled (the default) the bound time arguments are
//! clamped to the query range, matching InfluxQL's rounded GROUP BY
//! boundaries. Clamping never changes bucket membership, only the bounds.

use std::collections::HashMap;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::bucket::bucket_time_intervals_with_limit;
use crate::catalog::{CatalogSnapshot, Series, SeriesSource};
use crate::config::PlannerConfig;
use crate::error::Result;
use crate::query::error::PlanError;
use crate::query::error::PlanResult;
use crate::query::hlq::HighLevelQuery;
use crate::query::plan::QueryPlan;
use crate::query::statement::{LowLevelQuery, StatementLayout};
use crate::types::TimeInterval;

// ============================================================================
// Query Planner
// ============================================================================

/// Builds query plans from high-level queries and catalog snapshots
///
/// Holds no per-query state; one planner can serve any number of threads.
#[derive(Debug, Clone)]
pub struct QueryPlanner {
    /// Planner configuration
    config: PlannerConfig,

    /// Statement rendering settings derived from the config
    layout: StatementLayout,
}

impl Default for QueryPlanner {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryPlanner {
    /// Create a new query planner with default configuration
    pub fn new() -> Self {
        Self::from_valid_config(PlannerConfig::default())
    }

    /// Create a query planner with custom configuration
    ///
    /// The configuration is validated first: column names end up in statement
    /// text and must be plain identifiers.
    pub fn with_config(config: PlannerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: PlannerConfig) -> Self {
        let layout = config.statement_layout();
        Self { config, layout }
    }

    /// Get the planner configuration
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plan one query against a catalog snapshot
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use tsq_planner::catalog::{CatalogSnapshot, Series};
    /// use tsq_planner::query::{HighLevelQueryBuilder, QueryPlanner};
    /// use tsq_planner::types::{TagSet, TimeInterval};
    ///
    /// let snapshot = CatalogSnapshot::from_series(vec![Series::new(
    ///     "cpu",
    ///     "s1",
    ///     "cpu",
    ///     "usage_user",
    ///     TagSet::from_pairs(&[("host", "X")]),
    ///     TimeInterval::new(0, 200).unwrap(),
    /// )]);
    ///
    /// let query = HighLevelQueryBuilder::new("cpu", "usage_user")
    ///     .aggregation("avg")
    ///     .time_range(0, 120)
    ///     .group_by(Duration::from_nanos(60))
    ///     .build()
    ///     .unwrap();
    ///
    /// let plan = QueryPlanner::new().plan(&query, &snapshot).unwrap();
    /// assert_eq!(plan.len(), 2);
    /// assert_eq!(plan.query_count(), 2);
    /// ```
    pub fn plan(&self, query: &HighLevelQuery, snapshot: &CatalogSnapshot) -> PlanResult<QueryPlan> {
        let range = query.time_range()?;
        let intervals =
            bucket_time_intervals_with_limit(range, query.group_by, self.config.max_buckets)?;

        // Phase 1: bucket-independent predicates, cheapest first
        let matched: Vec<&Series> = snapshot
            .iter()
            .filter(|series| self.matches_query(series, query))
            .collect();

        // Phase 2: place each surviving series into every bucket it overlaps
        let mut statements: HashMap<&str, Arc<str>> = HashMap::new();
        let mut buckets: Vec<(TimeInterval, Vec<LowLevelQuery>)> = Vec::new();
        buckets
            .try_reserve_exact(intervals.len())
            .map_err(|_| PlanError::BucketAllocation {
                count: intervals.len(),
            })?;
        buckets.extend(intervals.iter().map(|bucket| (*bucket, Vec::new())));

        for (bucket, queries) in buckets.iter_mut() {
            let bucket = *bucket;
            let (start, end) = self.bound_interval(&bucket, &range);

            for series in matched.iter().filter(|s| s.matches_time_interval(&bucket)) {
                let statement = statements.entry(series.table.as_str()).or_insert_with(|| {
                    Arc::from(self.layout.render(&query.aggregation, &series.table))
                });
                queries.push(LowLevelQuery::bind(Arc::clone(statement), &series.id, start, end));
            }
        }

        let plan = QueryPlan::try_new(query.aggregation.clone(), self.layout.placement, buckets)?;

        debug!(
            query_id = query.id,
            buckets = plan.len(),
            matched_series = matched.len(),
            queries = plan.query_count(),
            statements = statements.len(),
            "Planned query"
        );

        Ok(plan)
    }

    /// Plan one query against a fresh snapshot of `source`
    pub fn plan_from<S>(&self, query: &HighLevelQuery, source: &S) -> PlanResult<QueryPlan>
    where
        S: SeriesSource + ?Sized,
    {
        let snapshot = source.snapshot();
        self.plan(query, &snapshot)
    }

    /// Plan many queries against one snapshot
    ///
    /// Results are returned in input order, one per query. Batches of at
    /// least `parallel_threshold` queries are planned on the rayon pool.
    pub fn plan_all(
        &self,
        queries: &[HighLevelQuery],
        snapshot: &CatalogSnapshot,
    ) -> Vec<PlanResult<QueryPlan>> {
        if queries.len() >= self.config.parallel_threshold {
            debug!(queries = queries.len(), "Planning batch in parallel");
            queries.par_iter().map(|q| self.plan(q, snapshot)).collect()
        } else {
            queries.iter().map(|q| self.plan(q, snapshot)).collect()
        }
    }

    /// Measurement, field and tag predicates, short-circuiting in that order
    fn matches_query(&self, series: &Series, query: &HighLevelQuery) -> bool {
        if !series.matches_measurement_name(&query.measurement) {
            trace!(series = %series.id, "Skipping series: measurement mismatch");
            return false;
        }
        if !series.matches_field_name(&query.field) {
            trace!(series = %series.id, "Skipping series: field mismatch");
            return false;
        }
        if !series.matches_tag_sets(&query.tag_filter) {
            trace!(series = %series.id, "Skipping series: tag filter mismatch");
            return false;
        }
        true
    }

    /// Time bounds to bind for a bucket
    fn bound_interval(&self, bucket: &TimeInterval, range: &TimeInterval) -> (i64, i64) {
        let bounds = if self.config.clamp_to_query_range {
            bucket.clamp_to(range)
        } else {
            *bucket
        };
        (bounds.start, bounds.end)
    }
}

/// Plan one query with the default planner configuration
pub fn plan(query: &HighLevelQuery, snapshot: &CatalogSnapshot) -> PlanResult<QueryPlan> {
    QueryPlanner::new().plan(query, snapshot)
}
