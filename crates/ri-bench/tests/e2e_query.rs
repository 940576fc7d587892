use std::fs;

use ri_bench::fixture::create_geometry_project;
use ri_core::FileContainer;
use ri_query::{ClangQuery, ClangQueryGatherer, QueryConfig, SymbolFinder};
use tempfile::TempDir;

fn load(path: &std::path::Path) -> FileContainer {
    FileContainer::new(path.to_string_lossy(), fs::read_to_string(path).unwrap())
}

#[test]
fn e2e_definitions_across_sources() {
    let tmp = TempDir::new().unwrap();
    let fixture = create_geometry_project(tmp.path());
    let sources: Vec<FileContainer> = fixture.sources.iter().map(|p| load(p)).collect();

    let mut gatherer = ClangQueryGatherer::new(
        sources,
        &[],
        "functionDecl(isDefinition())",
        &QueryConfig::default(),
    )
    .unwrap();
    let found: usize = gatherer
        .wait_for_finished()
        .iter()
        .map(|message| message.source_ranges.ranges.len())
        .sum();
    // square, point_distance, shape_area, shape_perimeter, main
    assert_eq!(found, 5);
}

#[test]
fn e2e_calls_into_other_files() {
    let tmp = TempDir::new().unwrap();
    let fixture = create_geometry_project(tmp.path());
    let shapes_c = load(&fixture.sources[1]);

    let message = ClangQuery::new()
        .find_locations(&shapes_c, r#"callExpr(callee(functionDecl(hasName("point_distance"))))"#)
        .unwrap();
    assert!(message.diagnostics.is_empty());
    assert_eq!(message.source_ranges.ranges.len(), 1);
    assert!(message.source_ranges.ranges[0].text.contains("point_distance"));
}

#[test]
fn e2e_rename_struct_through_headers() {
    let tmp = TempDir::new().unwrap();
    let fixture = create_geometry_project(tmp.path());
    let shapes_c = load(&fixture.sources[1]);
    let include = tmp.path().join("include");
    let shapes_c = shapes_c.with_arguments(vec![format!("-I{}", include.to_string_lossy())]);

    // `shape` in `const struct shape *shape` of line 3
    let message = SymbolFinder::new().find(&shapes_c, 3, 33).unwrap();
    assert_eq!(message.symbol_name, "shape");
    assert!(message.source_locations.file_paths.len() >= 2);
}
