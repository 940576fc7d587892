use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use ri_bench::fixture::create_scaled_project;
use ri_core::normalize_path;
use ri_parser::{DeclOccurrence, FrontEnd, FrontEndCallbacks, TreeSitterFrontEnd};
use tempfile::TempDir;

#[derive(Default)]
struct Counter {
    occurrences: usize,
}

impl FrontEndCallbacks for Counter {
    fn occurrence(&mut self, _occurrence: &DeclOccurrence<'_>) {
        self.occurrences += 1;
    }
}

/// Preprocess and walk whole translation units, headers included.
fn bench_front_end(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    let fixture = create_scaled_project(tmp.path(), 50, 11);
    let include = normalize_path(&tmp.path().join("include").to_string_lossy());
    let arguments = vec![format!("-I{include}")];
    let sources: Vec<String> = fixture
        .sources
        .iter()
        .map(|path| normalize_path(&path.to_string_lossy()))
        .collect();

    let mut front_end = TreeSitterFrontEnd::new();
    let mut counter = Counter::default();
    for source in &sources {
        front_end.run(source, &arguments, &mut counter).unwrap();
    }

    let mut group = c.benchmark_group("front_end_throughput");
    group.throughput(Throughput::Elements(counter.occurrences as u64));
    group.bench_function("translation_units_50", |b| {
        b.iter(|| {
            let mut counter = Counter::default();
            for source in &sources {
                let _ = front_end.run(source, &arguments, &mut counter);
            }
            counter.occurrences
        });
    });
    group.finish();
}

criterion_group!(benches, bench_front_end);
criterion_main!(benches);
