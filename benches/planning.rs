//! Query Planning Benchmarks
//!
//! Measures planning throughput as catalog size, bucket count and batch
//! size grow.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::time::Duration;
use tsq_planner::catalog::{CatalogSnapshot, Series};
use tsq_planner::query::{HighLevelQuery, HighLevelQueryBuilder, QueryPlanner};
use tsq_planner::types::{TagSet, TimeInterval};

// =============================================================================
// Test Data Generators
// =============================================================================

const HOUR_NS: i64 = 3_600_000_000_000;

/// Create a catalog of cpu series spread over hosts and two fields
fn create_snapshot(series_count: usize) -> CatalogSnapshot {
    let series = (0..series_count)
        .map(|i| {
            let host = format!("host_{}", i / 2);
            let field = if i % 2 == 0 { "usage_user" } else { "usage_system" };
            Series::new(
                "cpu",
                format!("series_{}", i),
                "cpu",
                field,
                TagSet::from_pairs(&[("host", host.as_str()), ("region", "us-east-1")]),
                TimeInterval::new(0, 24 * HOUR_NS).unwrap(),
            )
        })
        .collect();
    CatalogSnapshot::from_series(series)
}

/// One hour of cpu averages grouped into buckets of `width`
fn create_query(width: Duration) -> HighLevelQuery {
    HighLevelQueryBuilder::new("cpu", "usage_user")
        .aggregation("avg")
        .time_range(0, HOUR_NS)
        .group_by(width)
        .build()
        .unwrap()
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_catalog_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_catalog_size");
    let planner = QueryPlanner::new();
    let query = create_query(Duration::from_secs(300));

    for series_count in [100, 1_000, 10_000] {
        let snapshot = create_snapshot(series_count);
        group.throughput(Throughput::Elements(series_count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(series_count),
            &snapshot,
            |b, snapshot| b.iter(|| black_box(planner.plan(&query, snapshot))),
        );
    }

    group.finish();
}

fn bench_bucket_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_bucket_count");
    let planner = QueryPlanner::new();
    let snapshot = create_snapshot(1_000);

    for width_secs in [3_600u64, 300, 60, 10] {
        let query = create_query(Duration::from_secs(width_secs));
        group.bench_with_input(BenchmarkId::from_parameter(width_secs), &query, |b, query| {
            b.iter(|| black_box(planner.plan(query, &snapshot)))
        });
    }

    group.finish();
}

fn bench_batch_planning(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_all");
    let planner = QueryPlanner::new();
    let snapshot = create_snapshot(1_000);

    for batch_size in [1usize, 16, 64] {
        let queries: Vec<HighLevelQuery> = (0..batch_size)
            .map(|i| create_query(Duration::from_secs(60 + i as u64)))
            .collect();
        group.throughput(Throughput::Elements(batch_size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(batch_size), &queries, |b, queries| {
            b.iter(|| black_box(planner.plan_all(queries, &snapshot)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_catalog_size, bench_bucket_count, bench_batch_planning);
criterion_main!(benches);
