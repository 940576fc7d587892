use std::fs;

use ri_bench::fixture::{create_geometry_project, rewrite, touch};
use ri_core::{SourceLocationKind, SymbolKind};
use ri_indexer::{index, IndexConfig, ReindexState};
use ri_storage::StorageManager;
use tempfile::TempDir;

fn config() -> IndexConfig {
    IndexConfig {
        hardware_concurrency: Some(2),
        ..Default::default()
    }
}

#[test]
fn e2e_full_index_of_geometry_project() {
    let tmp = TempDir::new().unwrap();
    create_geometry_project(tmp.path());

    let report = index(tmp.path(), &config()).unwrap();
    assert_eq!(report.sources, 3);
    assert_eq!(report.headers, 2);
    assert_eq!(report.state, ReindexState::NeedsFullReindex);
    assert!(report.total_symbols > 0);

    let storage = StorageManager::open(tmp.path()).unwrap();
    let database = storage.database();

    let distance = database.fetch_symbols_by_name("point_distance").unwrap();
    assert_eq!(distance.len(), 1, "one symbol across declaration and definition");
    assert_eq!(distance[0].kind, SymbolKind::Function);
    let kinds: Vec<SourceLocationKind> = database
        .fetch_symbol_locations(&distance[0].usr)
        .unwrap()
        .into_iter()
        .map(|location| location.kind)
        .collect();
    for kind in [
        SourceLocationKind::Declaration,
        SourceLocationKind::Definition,
        SourceLocationKind::DeclarationReference,
    ] {
        assert!(kinds.contains(&kind), "missing {kind:?} in {kinds:?}");
    }

    let shape_max = database.fetch_symbols_by_name("SHAPE_MAX").unwrap();
    assert_eq!(shape_max.len(), 1);
    assert_eq!(shape_max[0].kind, SymbolKind::Macro);
    let usages = database
        .fetch_symbol_locations(&shape_max[0].usr)
        .unwrap()
        .into_iter()
        .filter(|location| location.kind == SourceLocationKind::MacroUsage)
        .count();
    assert!(usages >= 2, "used in shapes.h, shapes.c and main.c");
}

#[test]
fn e2e_unchanged_tree_is_up_to_date() {
    let tmp = TempDir::new().unwrap();
    create_geometry_project(tmp.path());

    index(tmp.path(), &config()).unwrap();
    let again = index(tmp.path(), &config()).unwrap();
    assert!(again.is_up_to_date());
}

#[test]
fn e2e_header_edit_reaches_every_includer() {
    let tmp = TempDir::new().unwrap();
    let fixture = create_geometry_project(tmp.path());
    index(tmp.path(), &config()).unwrap();

    let geometry_h = &fixture.headers[0];
    let content = fs::read_to_string(geometry_h)
        .unwrap()
        .replace("#endif", "extern int geometry_revision;\n\n#endif");
    rewrite(geometry_h, &content, 4_000_000_000);

    let report = index(tmp.path(), &config()).unwrap();
    assert_eq!(report.state, ReindexState::NeedsIncrementalReindex);

    let storage = StorageManager::open(tmp.path()).unwrap();
    let revision = storage
        .database()
        .fetch_symbols_by_name("geometry_revision")
        .unwrap();
    assert_eq!(revision.len(), 1);
}

#[test]
fn e2e_touched_source_alone_is_stale() {
    let tmp = TempDir::new().unwrap();
    let fixture = create_geometry_project(tmp.path());
    index(tmp.path(), &config()).unwrap();

    touch(&fixture.sources[2], 4_000_000_000);
    let report = index(tmp.path(), &config()).unwrap();
    assert_eq!(report.state, ReindexState::NeedsIncrementalReindex);
    assert!(index(tmp.path(), &config()).unwrap().is_up_to_date());
}
