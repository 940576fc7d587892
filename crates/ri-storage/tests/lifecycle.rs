use ri_core::{
    CompilerMacro, FilePathCaching, FileStatus, HasMissingIncludes, ProjectPartContainer,
    ProjectPartId, SourceDependency, SourceEntry, SourceLocationEntry, SourceLocationKind,
    SourceType, SymbolEntries, SymbolEntry, SymbolIndex, SymbolKind, UsedMacro,
};
use ri_storage::StorageManager;
use tempfile::TempDir;

#[test]
fn indexed_part_survives_reopen() {
    let tmp = TempDir::new().unwrap();
    let mut mgr = StorageManager::open(tmp.path()).unwrap();
    let main = mgr.paths().file_path_id("/src/main.cpp");
    let header = mgr.paths().file_path_id("/src/util.h");

    let mut part = ProjectPartContainer::new(ProjectPartId(1), vec![main]);
    part.compiler_macros = vec![CompilerMacro::new("NDEBUG", "1")];

    let mut symbols = SymbolEntries::new();
    symbols.insert(SymbolIndex(1), SymbolEntry::new("c:@F@helper#", "helper", SymbolKind::Function));
    let locations = vec![
        SourceLocationEntry {
            symbol_id: SymbolIndex(1),
            file_path_id: header,
            line: 2,
            column: 5,
            kind: SourceLocationKind::Declaration,
        },
        SourceLocationEntry {
            symbol_id: SymbolIndex(1),
            file_path_id: main,
            line: 4,
            column: 12,
            kind: SourceLocationKind::DeclarationReference,
        },
    ];

    let tx = mgr.database_mut().begin_immediate().unwrap();
    tx.clear_files(&[main, header]).unwrap();
    tx.add_symbols_and_source_locations(&symbols, &locations).unwrap();
    tx.insert_or_update_project_part(&part).unwrap();
    tx.update_project_part_sources(
        ProjectPartId(1),
        &[
            SourceEntry {
                file_path_id: main,
                source_type: SourceType::Source,
                last_modified: 10,
                has_missing_includes: HasMissingIncludes::No,
            },
            SourceEntry {
                file_path_id: header,
                source_type: SourceType::UserInclude,
                last_modified: 11,
                has_missing_includes: HasMissingIncludes::No,
            },
        ],
    )
    .unwrap();
    tx.insert_used_macros(&[UsedMacro::new("NDEBUG", main)]).unwrap();
    tx.insert_file_statuses(&[
        FileStatus { file_path_id: main, size: 80, last_modified: 10 },
        FileStatus { file_path_id: header, size: 30, last_modified: 11 },
    ])
    .unwrap();
    tx.insert_source_dependencies(&[SourceDependency::new(main, header)]).unwrap();
    tx.commit().unwrap();
    drop(mgr);

    let mgr = StorageManager::open(tmp.path()).unwrap();
    let db = mgr.database();
    assert_eq!(mgr.paths().file_path(header).as_deref(), Some("/src/util.h"));
    assert_eq!(db.fetch_symbol_locations("c:@F@helper#").unwrap().len(), 2);
    assert_eq!(db.fetch_used_macros(main).unwrap(), vec![UsedMacro::new("NDEBUG", main)]);
    assert_eq!(db.project_parts_for_source(main).unwrap(), vec![ProjectPartId(1)]);
    assert!(db.project_parts_for_source(header).unwrap().is_empty());
    assert_eq!(db.fetch_dependent_sources(header).unwrap(), vec![(main, ProjectPartId(1))]);

    let sources = db.fetch_project_part_sources(ProjectPartId(1)).unwrap();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources.iter().find(|s| s.file_path_id == header).unwrap().last_modified, 11);

    let artefact = db.fetch_project_part_artefact(ProjectPartId(1)).unwrap().unwrap();
    assert_eq!(artefact.compiler_macros, part.compiler_macros);
}
