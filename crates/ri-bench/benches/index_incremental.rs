use criterion::{criterion_group, criterion_main, Criterion};
use ri_bench::fixture::{create_scaled_project, rewrite};
use ri_indexer::{index, IndexConfig};
use tempfile::TempDir;

/// Re-index after one header changed; only its includers are collected.
fn bench_index_incremental(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    let fixture = create_scaled_project(tmp.path(), 200, 1);
    let config = IndexConfig::default();
    index(tmp.path(), &config).unwrap();

    let header = &fixture.headers[0];
    let mut group = c.benchmark_group("index_incremental");
    group.sample_size(20);
    group.bench_function("single_header_update", |b| {
        let mut iteration = 0u64;
        b.iter(|| {
            iteration += 1;
            let content = format!(
                "#ifndef MOD_0_H\n#define MOD_0_H\n#define MOD_0_LIMIT {iteration}\n\
                 struct record_0 {{ int id; int value; }};\n\
                 int mod_0_process(struct record_0 *record);\n\
                 int mod_0_validate(int value);\nint mod_0_iteration_{iteration};\n#endif\n"
            );
            // mtimes must grow every iteration
            rewrite(header, &content, 2_000_000_000 + iteration);
            index(tmp.path(), &config).unwrap()
        });
    });
    group.finish();
}

criterion_group!(benches, bench_index_incremental);
criterion_main!(benches);
