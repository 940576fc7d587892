use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use ri_bench::fixture::create_scaled_project;
use ri_indexer::{index, IndexConfig};
use tempfile::TempDir;

/// Full index of a fresh 200-module project.
fn bench_index_full(c: &mut Criterion) {
    let config = IndexConfig::default();

    let mut group = c.benchmark_group("index_full");
    group.sample_size(10);
    group.bench_function("modules_200", |b| {
        b.iter_batched(
            || {
                let tmp = TempDir::new().unwrap();
                create_scaled_project(tmp.path(), 200, 1);
                tmp
            },
            |tmp| index(tmp.path(), &config).unwrap(),
            BatchSize::PerIteration,
        );
    });
    group.finish();
}

criterion_group!(benches, bench_index_full);
criterion_main!(benches);
