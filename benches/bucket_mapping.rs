//! Bucket mapping and series building benchmarks.
//!
//! Histogram reservoirs are re-bucketed every export cycle, so this is the
//! only per-sample work the exporter does.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use metric_bridge::export::partition;
use metric_bridge::metrics::{bucket_counts, BucketLayout, SummaryStats};

fn samples(n: usize) -> Vec<i64> {
    // Deterministic spread over several orders of magnitude.
    (0..n as i64).map(|i| (i * 7919) % 100_000).collect()
}

/// TARGET: a full 1028-sample reservoir in well under 100us
fn bench_bucket_counts(c: &mut Criterion) {
    let mut group = c.benchmark_group("bucket_counts");

    let layouts = [
        (
            "explicit_8",
            BucketLayout::Explicit {
                bounds: vec![1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0],
            },
        ),
        (
            "linear_50",
            BucketLayout::Linear {
                count: 50,
                offset: 0.0,
                width: 2000.0,
            },
        ),
        (
            "exponential_20",
            BucketLayout::Exponential {
                count: 20,
                scale: 1.0,
                growth: 2.0,
            },
        ),
    ];

    for size in [128, 1028, 10_000] {
        let data = samples(size);
        for (name, layout) in &layouts {
            group.bench_with_input(BenchmarkId::new(*name, size), &data, |b, data| {
                b.iter(|| black_box(bucket_counts(black_box(layout), black_box(data))));
            });
        }
    }

    group.finish();
}

fn bench_summary_stats(c: &mut Criterion) {
    let data = samples(1028);
    c.bench_function("summary_stats_1028", |b| {
        b.iter(|| black_box(SummaryStats::from_samples(black_box(&data))));
    });
}

fn bench_partition(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition");

    for size in [200, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let items: Vec<u64> = (0..size as u64).collect();
                black_box(partition(items, 200))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_bucket_counts, bench_summary_stats, bench_partition);
criterion_main!(benches);
