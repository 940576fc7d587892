use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

use ri_core::{
    FilePathId, FileStatus, ProjectPartArtefact, ProjectPartContainer, ProjectPartId,
    ProjectPartPch, SourceDependency, SourceEntry, SourceLocationEntries, SymbolEntries,
    SymbolIndex, UsedMacro,
};
use rusqlite::{params, Transaction};

use crate::error::StorageError;

/// An immediate write transaction on the symbol database.
///
/// Dropping it without [`WriteTransaction::commit`] rolls every write back.
pub struct WriteTransaction<'conn> {
    tx: Transaction<'conn>,
    /// Symbols that lost locations in [`WriteTransaction::clear_files`].
    cleared_symbols: RefCell<BTreeSet<i64>>,
}

impl<'conn> WriteTransaction<'conn> {
    pub(crate) fn new(tx: Transaction<'conn>) -> Self {
        Self {
            tx,
            cleared_symbols: RefCell::new(BTreeSet::new()),
        }
    }

    pub fn commit(self) -> Result<(), StorageError> {
        self.tx.commit()?;
        Ok(())
    }

    /// Forget the per-file facts of `file_path_ids` (locations, used macros,
    /// outgoing include edges) before they are written again.
    pub fn clear_files(&self, file_path_ids: &[FilePathId]) -> Result<(), StorageError> {
        let mut located_symbols = self
            .tx
            .prepare_cached("SELECT DISTINCT symbol_id FROM locations WHERE file_id = ?1")?;
        let mut delete_locations = self
            .tx
            .prepare_cached("DELETE FROM locations WHERE file_id = ?1")?;
        let mut delete_macros = self
            .tx
            .prepare_cached("DELETE FROM used_macros WHERE file_id = ?1")?;
        let mut delete_dependencies = self
            .tx
            .prepare_cached("DELETE FROM source_dependencies WHERE file_id = ?1")?;

        let mut cleared = self.cleared_symbols.borrow_mut();
        for id in file_path_ids {
            let symbols = located_symbols.query_map(params![id.0], |row| row.get::<_, i64>(0))?;
            for symbol in symbols {
                cleared.insert(symbol?);
            }
            delete_locations.execute(params![id.0])?;
            delete_macros.execute(params![id.0])?;
            delete_dependencies.execute(params![id.0])?;
        }
        Ok(())
    }

    /// Merge symbols by USR and append their locations.
    pub fn add_symbols_and_source_locations(
        &self,
        symbols: &SymbolEntries,
        locations: &SourceLocationEntries,
    ) -> Result<(), StorageError> {
        let mut upsert = self.tx.prepare_cached(
            "INSERT INTO symbols (usr, name, kind, tags) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(usr) DO UPDATE SET
                 name = excluded.name,
                 kind = excluded.kind,
                 tags = excluded.tags
             RETURNING id",
        )?;
        let mut row_ids: HashMap<SymbolIndex, i64> = HashMap::with_capacity(symbols.len());
        for (index, entry) in symbols {
            let id: i64 = upsert.query_row(
                params![
                    entry.usr,
                    entry.symbol_name,
                    entry.kind.ordinal(),
                    entry.tags.bits()
                ],
                |row| row.get(0),
            )?;
            row_ids.insert(*index, id);
        }

        let mut insert = self.tx.prepare_cached(
            "INSERT OR IGNORE INTO locations (symbol_id, file_id, line, column, kind)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for location in locations {
            let symbol_id =
                row_ids
                    .get(&location.symbol_id)
                    .ok_or_else(|| StorageError::TransactionFailed {
                        reason: format!("location refers to unknown symbol {:?}", location.symbol_id),
                    })?;
            insert.execute(params![
                symbol_id,
                location.file_path_id.0,
                location.line,
                location.column,
                location.kind.ordinal()
            ])?;
        }
        Ok(())
    }

    /// Drop the symbols cleared files referred to that have no location
    /// left. Returns how many were dropped.
    pub fn remove_orphaned_symbols(&self) -> Result<usize, StorageError> {
        let candidates = std::mem::take(&mut *self.cleared_symbols.borrow_mut());
        let mut delete = self.tx.prepare_cached(
            "DELETE FROM symbols
             WHERE id = ?1 AND NOT EXISTS (SELECT 1 FROM locations WHERE symbol_id = ?1)",
        )?;
        let mut removed = 0;
        for id in candidates {
            removed += delete.execute(params![id])?;
        }
        Ok(removed)
    }

    pub fn insert_or_update_project_part(
        &self,
        part: &ProjectPartContainer,
    ) -> Result<(), StorageError> {
        let mut stmt = self.tx.prepare_cached(
            "INSERT INTO project_parts
                 (id, compiler_arguments, compiler_macros, include_search_paths, language)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                 compiler_arguments = excluded.compiler_arguments,
                 compiler_macros = excluded.compiler_macros,
                 include_search_paths = excluded.include_search_paths,
                 language = excluded.language",
        )?;
        stmt.execute(params![
            part.project_part_id.0,
            ProjectPartArtefact::arguments_to_json(&part.arguments),
            ProjectPartArtefact::macros_to_json(&part.compiler_macros),
            ProjectPartArtefact::include_search_paths_to_json(&part.include_search_paths),
            part.language.ordinal()
        ])?;
        Ok(())
    }

    pub fn update_project_part_sources(
        &self,
        project_part_id: ProjectPartId,
        entries: &[SourceEntry],
    ) -> Result<(), StorageError> {
        let mut stmt = self.tx.prepare_cached(
            "INSERT INTO project_part_sources
                 (project_part_id, file_id, source_type, has_missing_includes)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(project_part_id, file_id) DO UPDATE SET
                 source_type = excluded.source_type,
                 has_missing_includes = excluded.has_missing_includes",
        )?;
        for entry in entries {
            stmt.execute(params![
                project_part_id.0,
                entry.file_path_id.0,
                entry.source_type.ordinal(),
                entry.has_missing_includes.is_yes()
            ])?;
        }
        Ok(())
    }

    pub fn insert_used_macros(&self, macros: &[UsedMacro]) -> Result<(), StorageError> {
        let mut stmt = self.tx.prepare_cached(
            "INSERT OR IGNORE INTO used_macros (file_id, macro_name) VALUES (?1, ?2)",
        )?;
        for used in macros {
            stmt.execute(params![used.file_path_id.0, used.macro_name])?;
        }
        Ok(())
    }

    pub fn insert_file_statuses(&self, statuses: &[FileStatus]) -> Result<(), StorageError> {
        let mut stmt = self.tx.prepare_cached(
            "INSERT OR REPLACE INTO file_statuses (file_id, size, last_modified)
             VALUES (?1, ?2, ?3)",
        )?;
        for status in statuses {
            stmt.execute(params![
                status.file_path_id.0,
                status.size as i64,
                status.last_modified
            ])?;
        }
        Ok(())
    }

    pub fn insert_source_dependencies(
        &self,
        dependencies: &[SourceDependency],
    ) -> Result<(), StorageError> {
        let mut stmt = self.tx.prepare_cached(
            "INSERT OR IGNORE INTO source_dependencies (file_id, dependency_file_id)
             VALUES (?1, ?2)",
        )?;
        for dependency in dependencies {
            stmt.execute(params![
                dependency.file_path_id.0,
                dependency.dependency_file_path_id.0
            ])?;
        }
        Ok(())
    }

    pub fn insert_precompiled_header(&self, pch: &ProjectPartPch) -> Result<(), StorageError> {
        self.tx.execute(
            "INSERT OR REPLACE INTO precompiled_headers (project_part_id, pch_path, last_modified)
             VALUES (?1, ?2, ?3)",
            params![pch.project_part_id.0, pch.pch_path, pch.last_modified],
        )?;
        Ok(())
    }

    pub fn delete_precompiled_header(
        &self,
        project_part_id: ProjectPartId,
    ) -> Result<(), StorageError> {
        self.tx.execute(
            "DELETE FROM precompiled_headers WHERE project_part_id = ?1",
            params![project_part_id.0],
        )?;
        Ok(())
    }

    /// Remove the stored rows of a project part. Symbols stay: they are
    /// shared between parts and keyed by file.
    pub fn remove_project_part(&self, project_part_id: ProjectPartId) -> Result<(), StorageError> {
        self.tx.execute(
            "DELETE FROM project_part_sources WHERE project_part_id = ?1",
            params![project_part_id.0],
        )?;
        self.tx.execute(
            "DELETE FROM precompiled_headers WHERE project_part_id = ?1",
            params![project_part_id.0],
        )?;
        self.tx.execute(
            "DELETE FROM project_parts WHERE id = ?1",
            params![project_part_id.0],
        )?;
        Ok(())
    }
}
