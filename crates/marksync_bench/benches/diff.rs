//! Manifest diffing benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use marksync_bench::{diverged_local, manifest_of, random_records, BENCH_NOW_MS};
use marksync_engine::ManifestDiffer;
use marksync_protocol::{LocalManifest, DEFAULT_MAX_AGE};

/// Benchmark diffing a fresh account against remotes of growing size.
fn bench_diff_empty_local(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_empty_local");

    for size in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let remote = manifest_of(&random_records(size));
            let differ = ManifestDiffer::new(BENCH_NOW_MS, DEFAULT_MAX_AGE);

            b.iter(|| {
                let plan = differ.diff(LocalManifest::new(), black_box(&remote));
                black_box(plan);
            });
        });
    }

    group.finish();
}

/// Benchmark diffing mostly-synchronized manifests.
fn bench_diff_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_churn");

    for churn in [0.0, 0.01, 0.1].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:.0}%", churn * 100.0)),
            churn,
            |b, &churn| {
                let records = random_records(10_000);
                let remote = manifest_of(&records);
                let local = diverged_local(&records, churn);
                let differ = ManifestDiffer::new(BENCH_NOW_MS, DEFAULT_MAX_AGE);

                b.iter(|| {
                    let plan = differ.diff(local.clone(), black_box(&remote));
                    black_box(plan);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_diff_empty_local, bench_diff_churn);
criterion_main!(benches);
