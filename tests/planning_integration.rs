//! Integration tests for query planning
//!
//! These tests validate the complete planning pipeline:
//! - Series registration and snapshot isolation
//! - Measurement, field and tag filtering
//! - GROUP BY bucketing with empty-bucket preservation
//! - Argument binding and bound clamping
//! - Batch planning

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tsq_planner::catalog::{Series, SeriesCatalog, SeriesSource};
use tsq_planner::filter::{TagFilter, TagGroup, TagPredicate};
use tsq_planner::query::{
    AggregationPlacement, HighLevelQuery, HighLevelQueryBuilder, PlanError, QueryPlan,
    QueryPlanner, StatementArg,
};
use tsq_planner::types::{TagSet, TimeInterval};
use tsq_planner::PlannerConfig;

// ============================================================================
// Helper Functions
// ============================================================================

fn interval(start: i64, end: i64) -> TimeInterval {
    TimeInterval::new(start, end).unwrap()
}

fn cpu_series(id: &str, tags: &[(&str, &str)], valid: (i64, i64)) -> Series {
    Series::new(
        "cpu",
        id,
        "cpu",
        "usage_user",
        TagSet::from_pairs(tags),
        interval(valid.0, valid.1),
    )
}

/// Catalog with several hosts across two tables and an unrelated measurement
fn create_test_catalog() -> SeriesCatalog {
    let catalog = SeriesCatalog::new();
    catalog.register(cpu_series("host-a", &[("host", "a"), ("region", "us-east")], (0, 10_000)));
    catalog.register(cpu_series("host-b", &[("host", "b"), ("region", "us-west")], (0, 10_000)));
    catalog.register(cpu_series("host-c", &[("host", "c"), ("region", "eu-west")], (5_000, 10_000)));
    catalog.register(Series::new(
        "cpu_archive",
        "host-d",
        "cpu",
        "usage_user",
        TagSet::from_pairs(&[("host", "d"), ("region", "us-east")]),
        interval(0, 2_000),
    ));
    catalog.register(Series::new(
        "mem",
        "mem-a",
        "mem",
        "used",
        TagSet::from_pairs(&[("host", "a")]),
        interval(0, 10_000),
    ));
    catalog
}

fn cpu_query(start: i64, end: i64, width: u64) -> HighLevelQueryBuilder {
    HighLevelQueryBuilder::new("cpu", "usage_user")
        .aggregation("avg")
        .time_range(start, end)
        .group_by(Duration::from_nanos(width))
}

/// Bucket → set of bound argument tuples, for order-insensitive comparison
fn bindings(plan: &QueryPlan) -> BTreeMap<TimeInterval, BTreeSet<(String, i64, i64)>> {
    plan.buckets()
        .map(|(bucket, queries)| {
            let set = queries
                .iter()
                .map(|q| {
                    let (start, end) = q.time_bounds().unwrap();
                    (q.row_id().unwrap().to_string(), start, end)
                })
                .collect();
            (*bucket, set)
        })
        .collect()
}

fn row_ids(plan: &QueryPlan, bucket: TimeInterval) -> BTreeSet<String> {
    plan.queries(&bucket)
        .unwrap()
        .iter()
        .map(|q| q.row_id().unwrap().to_string())
        .collect()
}

// ============================================================================
// End-to-End Planning
// ============================================================================

#[test]
fn test_end_to_end_two_buckets() {
    let catalog = SeriesCatalog::new();
    catalog.register(cpu_series("A", &[("host", "X")], (0, 200)));

    let query = cpu_query(0, 120, 60).build().unwrap();
    let plan = QueryPlanner::new().plan(&query, &catalog.snapshot()).unwrap();

    let expected: BTreeMap<_, BTreeSet<_>> = [
        (interval(0, 60), [("A".to_string(), 0, 60)].into_iter().collect()),
        (interval(60, 120), [("A".to_string(), 60, 120)].into_iter().collect()),
    ]
    .into_iter()
    .collect();

    assert_eq!(bindings(&plan), expected);
    assert_eq!(plan.aggregation(), "avg");
    assert_eq!(
        plan.queries(&interval(0, 60)).unwrap()[0].statement(),
        "SELECT avg(value) FROM cpu WHERE series_id = ? AND timestamp_ns >= ? AND timestamp_ns < ?"
    );
}

#[test]
fn test_bucket_count_and_clamped_last_end() {
    let catalog = SeriesCatalog::new();
    catalog.register(cpu_series("A", &[], (0, 1_000)));

    let plan = QueryPlanner::new()
        .plan(&cpu_query(0, 100, 30).build().unwrap(), &catalog.snapshot())
        .unwrap();

    let starts: Vec<i64> = plan.intervals().map(|b| b.start).collect();
    assert_eq!(starts, vec![0, 30, 60, 90]);

    let last = plan.queries(&interval(90, 120)).unwrap();
    assert_eq!(last[0].time_bounds(), Some((90, 100)));
}

#[test]
fn test_argument_binding_clamped_to_query_range() {
    let catalog = SeriesCatalog::new();
    catalog.register(cpu_series("s1", &[], (0, 5_000)));

    let plan = QueryPlanner::new()
        .plan(&cpu_query(1500, 1800, 1000).build().unwrap(), &catalog.snapshot())
        .unwrap();

    assert_eq!(plan.len(), 1);
    let queries = plan.queries(&interval(1000, 2000)).unwrap();
    assert_eq!(
        queries[0].args(),
        &[
            StatementArg::Text("s1".to_string()),
            StatementArg::BigInt(1500),
            StatementArg::BigInt(1800),
        ]
    );
}

#[test]
fn test_raw_bucket_bounds_when_clamping_disabled() {
    let catalog = SeriesCatalog::new();
    catalog.register(cpu_series("s1", &[], (0, 5_000)));

    let planner = QueryPlanner::with_config(PlannerConfig {
        clamp_to_query_range: false,
        ..Default::default()
    })
    .unwrap();
    let plan = planner
        .plan(&cpu_query(1500, 1800, 1000).build().unwrap(), &catalog.snapshot())
        .unwrap();

    let queries = plan.queries(&interval(1000, 2000)).unwrap();
    assert_eq!(queries[0].time_bounds(), Some((1000, 2000)));
}

#[test]
fn test_whole_range_without_group_by() {
    let catalog = create_test_catalog();
    let plan = QueryPlanner::new()
        .plan(&cpu_query(100, 9_000, 0).build().unwrap(), &catalog.snapshot())
        .unwrap();

    assert_eq!(plan.len(), 1);
    assert_eq!(
        row_ids(&plan, interval(100, 9_000)),
        ["host-a", "host-b", "host-c", "host-d"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    );
}

#[test]
fn test_degenerate_range() {
    let catalog = create_test_catalog();
    let plan = QueryPlanner::new()
        .plan(&cpu_query(1_000, 1_000, 60).build().unwrap(), &catalog.snapshot())
        .unwrap();

    assert_eq!(plan.intervals().copied().collect::<Vec<_>>(), vec![interval(1_000, 1_000)]);
    assert!(row_ids(&plan, interval(1_000, 1_000)).contains("host-a"));
    assert!(!row_ids(&plan, interval(1_000, 1_000)).contains("host-c"));
}

// ============================================================================
// Empty Buckets and No Matches
// ============================================================================

#[test]
fn test_no_matching_series_keeps_every_bucket() {
    let catalog = create_test_catalog();
    let query = HighLevelQueryBuilder::new("disk", "free")
        .aggregation("min")
        .time_range(0, 1_000)
        .group_by(Duration::from_nanos(100))
        .build()
        .unwrap();

    let plan = QueryPlanner::new().plan(&query, &catalog.snapshot()).unwrap();

    assert_eq!(plan.len(), 10);
    assert_eq!(plan.query_count(), 0);
    assert!(plan.buckets().all(|(_, queries)| queries.is_empty()));
}

#[test]
fn test_validity_window_restricts_buckets() {
    let catalog = create_test_catalog();
    let plan = QueryPlanner::new()
        .plan(&cpu_query(0, 6_000, 2_000).build().unwrap(), &catalog.snapshot())
        .unwrap();

    // host-d is only valid before 2000, host-c only from 5000
    assert!(row_ids(&plan, interval(0, 2_000)).contains("host-d"));
    assert!(!row_ids(&plan, interval(2_000, 4_000)).contains("host-d"));
    assert!(!row_ids(&plan, interval(2_000, 4_000)).contains("host-c"));
    assert!(row_ids(&plan, interval(4_000, 6_000)).contains("host-c"));
}

// ============================================================================
// Tag Filtering
// ============================================================================

#[test]
fn test_tag_groups_or_of_ands() {
    let catalog = SeriesCatalog::new();
    catalog.register(cpu_series("cd", &[("c", "3"), ("d", "9")], (0, 100)));
    catalog.register(cpu_series("a_only", &[("a", "1")], (0, 100)));
    catalog.register(cpu_series("ab", &[("a", "1"), ("b", "2")], (0, 100)));

    let query = cpu_query(0, 100, 0)
        .with_group(TagGroup::new().with_tag("a", "1").with_tag("b", "2"))
        .with_group(TagGroup::new().with_tag("c", "3"))
        .build()
        .unwrap();

    let plan = QueryPlanner::new().plan(&query, &catalog.snapshot()).unwrap();
    let ids = row_ids(&plan, interval(0, 100));

    assert!(ids.contains("cd"));
    assert!(ids.contains("ab"));
    assert!(!ids.contains("a_only"));
}

#[test]
fn test_parsed_predicates() {
    let catalog = create_test_catalog();
    let filter = TagFilter::parse(&[vec!["region^=us-", "host!=b"]]).unwrap();
    let query = cpu_query(0, 1_000, 0).tag_filter(filter).build().unwrap();

    let plan = QueryPlanner::new().plan(&query, &catalog.snapshot()).unwrap();
    let ids = row_ids(&plan, interval(0, 1_000));
    assert_eq!(
        ids,
        ["host-a", "host-d"].iter().map(|s| s.to_string()).collect()
    );
}

#[test]
fn test_regex_predicate() {
    let catalog = create_test_catalog();
    let group = TagGroup::new().with(TagPredicate::regex("region", "^(eu|us)-west$").unwrap());
    let query = cpu_query(5_000, 6_000, 0).with_group(group).build().unwrap();

    let plan = QueryPlanner::new().plan(&query, &catalog.snapshot()).unwrap();
    assert_eq!(
        row_ids(&plan, interval(5_000, 6_000)),
        ["host-b", "host-c"].iter().map(|s| s.to_string()).collect()
    );
}

#[test]
fn test_invalid_predicate_is_rejected() {
    let result = TagFilter::parse(&[vec!["host=~(unclosed"]]);
    assert!(matches!(result, Err(PlanError::InvalidTagPredicate(_))));
}

// ============================================================================
// Determinism and Snapshots
// ============================================================================

#[test]
fn test_repeated_planning_is_set_equal() {
    let catalog = create_test_catalog();
    let query = cpu_query(0, 10_000, 1_000).build().unwrap();
    let planner = QueryPlanner::new();

    let first = planner.plan(&query, &catalog.snapshot()).unwrap();
    let second = planner.plan(&query, &catalog.snapshot()).unwrap();

    assert_eq!(bindings(&first), bindings(&second));
}

#[test]
fn test_snapshot_is_isolated_from_later_registration() {
    let catalog = create_test_catalog();
    let snapshot = catalog.snapshot();
    catalog.register(cpu_series("late", &[], (0, 10_000)));

    let query = cpu_query(0, 1_000, 0).build().unwrap();
    let planner = QueryPlanner::new();

    let old = planner.plan(&query, &snapshot).unwrap();
    let new = planner.plan_from(&query, &catalog).unwrap();

    assert!(!row_ids(&old, interval(0, 1_000)).contains("late"));
    assert!(row_ids(&new, interval(0, 1_000)).contains("late"));
}

#[test]
fn test_concurrent_planning_over_shared_snapshot() {
    let snapshot = create_test_catalog().snapshot();
    let planner = Arc::new(QueryPlanner::new());
    let query = Arc::new(cpu_query(0, 10_000, 500).build().unwrap());
    let expected = bindings(&planner.plan(&query, &snapshot).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let planner = Arc::clone(&planner);
            let query = Arc::clone(&query);
            let snapshot = snapshot.clone();
            thread::spawn(move || bindings(&planner.plan(&query, &snapshot).unwrap()))
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

// ============================================================================
// Statements and Placement
// ============================================================================

#[test]
fn test_distinct_statements_per_table() {
    let catalog = create_test_catalog();
    let plan = QueryPlanner::new()
        .plan(&cpu_query(0, 1_000, 0).build().unwrap(), &catalog.snapshot())
        .unwrap();

    let statements = plan.distinct_statements();
    assert_eq!(statements.len(), 2);
    assert!(statements.iter().any(|s| s.contains("FROM cpu_archive ")));
}

#[test]
fn test_client_side_aggregation() {
    let catalog = create_test_catalog();
    let planner = QueryPlanner::with_config(PlannerConfig {
        aggregation_placement: AggregationPlacement::Client,
        value_column: "val".to_string(),
        ..Default::default()
    })
    .unwrap();
    let plan = planner
        .plan(&cpu_query(0, 1_000, 0).build().unwrap(), &catalog.snapshot())
        .unwrap();

    assert_eq!(plan.placement(), AggregationPlacement::Client);
    for (_, queries) in plan.buckets() {
        for q in queries {
            assert!(q.statement().starts_with("SELECT val FROM "));
        }
    }
}

// ============================================================================
// Errors and Limits
// ============================================================================

#[test]
fn test_inverted_range_is_an_error() {
    let mut query = cpu_query(0, 100, 10).build().unwrap();
    query.start = 500;

    let err = QueryPlanner::new()
        .plan(&query, &create_test_catalog().snapshot())
        .unwrap_err();
    assert!(err.is_user_error());
    assert_eq!(err, PlanError::InvalidTimeRange { start: 500, end: 100 });
}

#[test]
fn test_bucket_limit() {
    let planner = QueryPlanner::with_config(PlannerConfig {
        max_buckets: 50,
        ..Default::default()
    })
    .unwrap();
    let query = cpu_query(0, 1_000_000, 1).build().unwrap();

    let err = planner.plan(&query, &create_test_catalog().snapshot()).unwrap_err();
    assert!(matches!(err, PlanError::TooManyBuckets { limit: 50, .. }));
}

// ============================================================================
// Batch Planning
// ============================================================================

#[test]
fn test_plan_all_matches_individual_plans() {
    let catalog = create_test_catalog();
    let snapshot = catalog.snapshot();
    let planner = QueryPlanner::new();

    let queries: Vec<HighLevelQuery> = (1..=16)
        .map(|i| cpu_query(0, 10_000, i * 250).id(i as i64).build().unwrap())
        .collect();

    let batch = planner.plan_all(&queries, &snapshot);
    assert_eq!(batch.len(), queries.len());

    for (query, result) in queries.iter().zip(&batch) {
        let single = planner.plan(query, &snapshot).unwrap();
        assert_eq!(bindings(result.as_ref().unwrap()), bindings(&single));
    }
}
