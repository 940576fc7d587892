mod tables;
mod translation_unit;

use std::sync::Arc;

use ri_core::{FileContainer, FilePathCaching, FilePathId};
use ri_parser::{FrontEnd, TreeSitterFrontEnd};

pub use tables::CollectedTables;

use crate::processor_manager::{Processor, ProcessorFactory};
use crate::sources_manager::{CollectedStamps, SourcesManager};
use translation_unit::TranslationUnitCollector;

/// Runs the front end over the files of one task and gathers the tables
/// that task writes to the database.
///
/// The [`SourcesManager`] outlives tasks: headers this collector already
/// collected unchanged, and whose facts were stored, are not collected
/// again.
pub struct SymbolsCollector {
    front_end: Box<dyn FrontEnd>,
    paths: Arc<dyn FilePathCaching>,
    sources: SourcesManager,
    files: Vec<(FilePathId, Vec<String>)>,
    tables: CollectedTables,
}

impl SymbolsCollector {
    pub fn new(paths: Arc<dyn FilePathCaching>) -> Self {
        Self::with_front_end(Box::new(TreeSitterFrontEnd::new()), paths)
    }

    pub fn with_front_end(front_end: Box<dyn FrontEnd>, paths: Arc<dyn FilePathCaching>) -> Self {
        Self {
            front_end,
            paths,
            sources: SourcesManager::new(),
            files: Vec::new(),
            tables: CollectedTables::default(),
        }
    }

    pub fn add_file(&mut self, file_path_id: FilePathId, arguments: Vec<String>) {
        self.files.push((file_path_id, arguments));
    }

    /// Run every added file. False when at least one translation unit could
    /// not be processed; what the others produced is kept.
    pub fn collect_symbols(&mut self) -> bool {
        let mut succeeded = true;
        let mut missing_includes = Vec::new();
        self.sources.sync_confirmed();

        for (file_path_id, arguments) in std::mem::take(&mut self.files) {
            let Some(path) = self.paths.file_path(file_path_id) else {
                tracing::warn!(file = %file_path_id, "unknown file path id");
                succeeded = false;
                continue;
            };

            let mut callbacks = TranslationUnitCollector::new(
                self.paths.as_ref(),
                &mut self.sources,
                &mut self.tables,
                &mut missing_includes,
            );
            match self.front_end.run(&path, &arguments, &mut callbacks) {
                Ok(summary) => {
                    for diagnostic in &summary.diagnostics {
                        tracing::debug!(
                            file = %diagnostic.file,
                            line = diagnostic.line,
                            "{}",
                            diagnostic.message
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(file = %path, error = %e, "translation unit failed");
                    succeeded = false;
                }
            }
            self.sources.update_modified_time_stamps();
        }

        let flagged = self.tables.finish(&missing_includes);
        self.sources.mark_missing_includes(&flagged);
        succeeded
    }

    pub fn tables(&self) -> &CollectedTables {
        &self.tables
    }

    /// The tables to store, with the stamps to confirm once they are.
    pub fn take_results(&mut self) -> (CollectedTables, CollectedStamps) {
        (std::mem::take(&mut self.tables), self.sources.take_collected())
    }
}

impl Processor for SymbolsCollector {
    fn set_unsaved_files(&mut self, files: &[FileContainer]) {
        self.front_end.set_unsaved_files(files);
    }

    fn clear(&mut self) {
        self.files.clear();
        self.tables = CollectedTables::default();
        self.sources.discard_collected();
    }
}

/// Creates collectors sharing one path cache.
#[derive(Clone)]
pub struct SymbolsCollectorFactory {
    paths: Arc<dyn FilePathCaching>,
}

impl SymbolsCollectorFactory {
    pub fn new(paths: Arc<dyn FilePathCaching>) -> Self {
        Self { paths }
    }
}

impl ProcessorFactory for SymbolsCollectorFactory {
    type Processor = SymbolsCollector;

    fn create(&self) -> SymbolsCollector {
        SymbolsCollector::new(self.paths.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use ri_core::{normalize_path, SourceLocationKind, SourceType, SymbolKind};
    use ri_storage::FilePathCache;

    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> String {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        normalize_path(&path.to_string_lossy())
    }

    fn collector() -> (SymbolsCollector, Arc<FilePathCache>) {
        let paths = Arc::new(FilePathCache::in_memory());
        (SymbolsCollector::new(paths.clone()), paths)
    }

    fn cxx() -> Vec<String> {
        vec!["-x".to_string(), "c++".to_string()]
    }

    #[test]
    fn collects_symbols_and_dependencies() {
        let dir = tempfile::tempdir().unwrap();
        let header = write(dir.path(), "shape.h", "#pragma once\nstruct Shape { int sides; };\n");
        let main = write(
            dir.path(),
            "main.cpp",
            "#include \"shape.h\"\nShape square;\nint area(Shape s) { return s.sides; }\n",
        );
        let (mut collector, paths) = collector();
        let main_id = paths.file_path_id(&main);
        let header_id = paths.file_path_id(&header);

        collector.add_file(main_id, cxx());
        assert!(collector.collect_symbols());

        let tables = collector.tables();
        let names: Vec<&str> = tables.symbols.values().map(|s| s.symbol_name.as_str()).collect();
        assert!(names.contains(&"Shape"));
        assert!(names.contains(&"area"));
        assert!(tables
            .symbols
            .values()
            .any(|s| s.symbol_name == "Shape" && s.kind == SymbolKind::Record));
        assert_eq!(tables.collected_file_ids(), {
            let mut ids = vec![main_id, header_id];
            ids.sort();
            ids
        });
        assert!(tables
            .source_dependencies
            .iter()
            .any(|d| d.file_path_id == main_id && d.dependency_file_path_id == header_id));
        assert!(tables
            .source_entries
            .iter()
            .any(|e| e.file_path_id == main_id && e.source_type == SourceType::Source));
    }

    #[test]
    fn unchanged_header_is_collected_once_per_collector() {
        let dir = tempfile::tempdir().unwrap();
        let header = write(dir.path(), "common.h", "#pragma once\nint shared;\n");
        let a = write(dir.path(), "a.cpp", "#include \"common.h\"\nint a;\n");
        let b = write(dir.path(), "b.cpp", "#include \"common.h\"\nint b;\n");
        let (mut collector, paths) = collector();
        let header_id = paths.file_path_id(&header);

        collector.add_file(paths.file_path_id(&a), cxx());
        collector.collect_symbols();
        let (tables, stamps) = collector.take_results();
        assert!(tables.collected_file_ids().contains(&header_id));
        stamps.confirm();
        collector.clear();

        collector.add_file(paths.file_path_id(&b), cxx());
        collector.collect_symbols();
        assert!(!collector.tables().collected_file_ids().contains(&header_id));
    }

    #[test]
    fn header_of_an_unstored_task_is_collected_again() {
        let dir = tempfile::tempdir().unwrap();
        let header = write(dir.path(), "common.h", "#pragma once\nint shared;\n");
        let a = write(dir.path(), "a.cpp", "#include \"common.h\"\nint a;\n");
        let (mut collector, paths) = collector();
        let header_id = paths.file_path_id(&header);

        for _ in 0..2 {
            collector.add_file(paths.file_path_id(&a), cxx());
            collector.collect_symbols();
            // the stamps are dropped as when the transaction rolls back
            let (tables, _stamps) = collector.take_results();
            assert!(tables.collected_file_ids().contains(&header_id));
            collector.clear();
        }
    }

    #[test]
    fn skipped_header_still_flags_missing_includes() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.h", "#pragma once\n#include \"absent.h\"\nint b;\n");
        let a = write(dir.path(), "a.c", "#include \"b.h\"\nint a;\n");
        let d = write(dir.path(), "d.c", "#include \"b.h\"\nint d;\n");
        let (mut collector, paths) = collector();
        let flagged = |tables: &CollectedTables, id: FilePathId| {
            tables
                .source_entries
                .iter()
                .find(|e| e.file_path_id == id)
                .map(|e| e.has_missing_includes.is_yes())
        };

        let a_id = paths.file_path_id(&a);
        collector.add_file(a_id, vec!["-x".to_string(), "c".to_string()]);
        collector.collect_symbols();
        let (tables, stamps) = collector.take_results();
        assert_eq!(flagged(&tables, a_id), Some(true));
        stamps.confirm();
        collector.clear();

        let d_id = paths.file_path_id(&d);
        let b_id = paths.file_path_id(&normalize_path(&dir.path().join("b.h").to_string_lossy()));
        collector.add_file(d_id, vec!["-x".to_string(), "c".to_string()]);
        collector.collect_symbols();
        let tables = collector.tables();
        assert!(!tables.collected_file_ids().contains(&b_id));
        assert_eq!(flagged(tables, d_id), Some(true));
        assert_eq!(flagged(tables, b_id), Some(true));
    }

    #[test]
    fn missing_include_flags_includer() {
        let dir = tempfile::tempdir().unwrap();
        let main = write(dir.path(), "main.c", "#include \"nowhere.h\"\nint x;\n");
        let (mut collector, paths) = collector();
        let main_id = paths.file_path_id(&main);

        collector.add_file(main_id, vec!["-x".to_string(), "c".to_string()]);
        collector.collect_symbols();

        let entry = collector
            .tables()
            .source_entries
            .iter()
            .find(|e| e.file_path_id == main_id)
            .copied()
            .unwrap();
        assert!(entry.has_missing_includes.is_yes());
    }

    #[test]
    fn header_guard_is_not_a_used_macro() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "guarded.h",
            "#ifndef GUARDED_H\n#define GUARDED_H\nint g;\n#endif\n",
        );
        let main = write(
            dir.path(),
            "main.cpp",
            "#include \"guarded.h\"\n#ifdef FEATURE\nint f;\n#endif\n",
        );
        let (mut collector, paths) = collector();

        collector.add_file(paths.file_path_id(&main), cxx());
        collector.collect_symbols();

        let used: Vec<&str> = collector
            .tables()
            .used_macros
            .iter()
            .map(|m| m.macro_name.as_str())
            .collect();
        assert!(used.contains(&"FEATURE"));
        assert!(!used.contains(&"GUARDED_H"));
    }

    #[test]
    fn macro_definition_and_usage_are_located() {
        let dir = tempfile::tempdir().unwrap();
        let main = write(dir.path(), "main.c", "#define SIZE 4\nint size(void) { return SIZE; }\n");
        let (mut collector, paths) = collector();
        collector.add_file(paths.file_path_id(&main), vec!["-x".to_string(), "c".to_string()]);
        collector.collect_symbols();

        let tables = collector.tables();
        let (index, _) = tables
            .symbols
            .iter()
            .find(|(_, s)| s.symbol_name == "SIZE" && s.kind == SymbolKind::Macro)
            .unwrap();
        let kinds: Vec<SourceLocationKind> = tables
            .source_locations
            .iter()
            .filter(|l| l.symbol_id == *index)
            .map(|l| l.kind)
            .collect();
        assert!(kinds.contains(&SourceLocationKind::MacroDefinition));
        assert!(kinds.contains(&SourceLocationKind::MacroUsage));
    }

    #[test]
    fn unknown_file_id_fails_the_run() {
        let (mut collector, _) = collector();
        collector.add_file(FilePathId(4242), cxx());
        assert!(!collector.collect_symbols());
        assert!(collector.tables().is_empty());
    }
}
