use std::collections::HashMap;

use ri_core::{
    FilePathId, FileStatus, HasMissingIncludes, SourceDependency, SourceEntry,
    SourceLocationEntries, SourceLocationEntry, SymbolEntries, SymbolEntry, SymbolIndex, UsedMacro,
};

/// Everything collected from the translation units of one task.
#[derive(Debug, Default)]
pub struct CollectedTables {
    pub symbols: SymbolEntries,
    pub source_locations: SourceLocationEntries,
    pub used_macros: Vec<UsedMacro>,
    pub file_statuses: Vec<FileStatus>,
    pub source_dependencies: Vec<SourceDependency>,
    pub source_entries: Vec<SourceEntry>,
    symbol_indices: HashMap<String, SymbolIndex>,
}

impl CollectedTables {
    /// Index of the symbol with `entry.usr`, registering it on first sight.
    pub(crate) fn intern_symbol(&mut self, entry: SymbolEntry) -> SymbolIndex {
        if let Some(index) = self.symbol_indices.get(&entry.usr) {
            return *index;
        }
        let index = SymbolIndex(self.symbol_indices.len() as u64 + 1);
        self.symbol_indices.insert(entry.usr.clone(), index);
        self.symbols.insert(index, entry);
        index
    }

    pub(crate) fn push_location(&mut self, location: SourceLocationEntry) {
        self.source_locations.push(location);
    }

    /// Sort and deduplicate the tables, then flag every file that
    /// transitively includes a file with missing includes. Returns the
    /// flagged ids, sorted.
    pub(crate) fn finish(&mut self, missing: &[FilePathId]) -> Vec<FilePathId> {
        self.used_macros.sort();
        self.used_macros.dedup();
        self.file_statuses.sort();
        self.file_statuses.dedup();
        self.source_dependencies.sort();
        self.source_dependencies.dedup();
        self.source_entries.sort_by_key(|e| e.file_path_id);
        self.source_entries.dedup_by_key(|e| e.file_path_id);

        let flagged = propagate_missing_includes(missing, &self.source_dependencies);
        for id in &flagged {
            if let Ok(index) = self
                .source_entries
                .binary_search_by_key(id, |e| e.file_path_id)
            {
                self.source_entries[index].has_missing_includes = HasMissingIncludes::Yes;
            }
        }
        flagged
    }

    /// Ids of the files whose facts were collected and must replace the
    /// stored ones.
    pub fn collected_file_ids(&self) -> Vec<FilePathId> {
        self.file_statuses.iter().map(|s| s.file_path_id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.file_statuses.is_empty() && self.symbols.is_empty()
    }
}

/// Fixed point over the include edges: a file is flagged when it has a
/// missing include itself or includes a flagged file. Cycles terminate.
pub(crate) fn propagate_missing_includes(
    missing: &[FilePathId],
    dependencies: &[SourceDependency],
) -> Vec<FilePathId> {
    let mut flagged: Vec<FilePathId> = missing.to_vec();
    flagged.sort();
    flagged.dedup();

    loop {
        let mut added = Vec::new();
        for dependency in dependencies {
            if flagged.binary_search(&dependency.dependency_file_path_id).is_ok()
                && flagged.binary_search(&dependency.file_path_id).is_err()
            {
                added.push(dependency.file_path_id);
            }
        }
        if added.is_empty() {
            return flagged;
        }
        flagged.extend(added);
        flagged.sort();
        flagged.dedup();
    }
}

#[cfg(test)]
mod tests {
    use ri_core::{SourceType, SymbolKind};

    use super::*;

    fn edge(from: i32, to: i32) -> SourceDependency {
        SourceDependency::new(FilePathId(from), FilePathId(to))
    }

    #[test]
    fn missing_includes_propagate_transitively() {
        // a -> b -> (missing), d -> a, e unrelated
        let (a, b, d) = (1, 2, 4);
        let edges = vec![edge(a, b), edge(d, a), edge(5, 6)];
        let flagged = propagate_missing_includes(&[FilePathId(b)], &edges);
        assert_eq!(flagged, vec![FilePathId(a), FilePathId(b), FilePathId(d)]);
    }

    #[test]
    fn propagation_survives_cycles() {
        let edges = vec![edge(1, 2), edge(2, 1), edge(3, 2)];
        let flagged = propagate_missing_includes(&[FilePathId(2)], &edges);
        assert_eq!(flagged, vec![FilePathId(1), FilePathId(2), FilePathId(3)]);
    }

    #[test]
    fn symbols_are_interned_by_usr() {
        let mut tables = CollectedTables::default();
        let a = tables.intern_symbol(SymbolEntry::new("c:@a", "a", SymbolKind::Variable));
        let b = tables.intern_symbol(SymbolEntry::new("c:@b", "b", SymbolKind::Variable));
        assert_ne!(a, b);
        assert_eq!(
            tables.intern_symbol(SymbolEntry::new("c:@a", "a", SymbolKind::Variable)),
            a
        );
        assert_eq!(tables.symbols.len(), 2);
    }

    #[test]
    fn finish_flags_source_entries() {
        let mut tables = CollectedTables::default();
        for id in [2, 1, 1] {
            tables.source_entries.push(SourceEntry {
                file_path_id: FilePathId(id),
                source_type: SourceType::UserInclude,
                last_modified: 0,
                has_missing_includes: HasMissingIncludes::No,
            });
        }
        tables.source_dependencies = vec![edge(1, 2), edge(1, 2)];
        tables.finish(&[FilePathId(2)]);

        assert_eq!(tables.source_entries.len(), 2);
        assert_eq!(tables.source_dependencies.len(), 1);
        assert!(tables
            .source_entries
            .iter()
            .all(|e| e.has_missing_includes.is_yes()));
    }
}
