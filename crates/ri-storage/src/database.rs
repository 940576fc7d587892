use std::path::Path;

use ri_core::{
    FilePathId, FileStatus, Language, ProjectPartArtefact, ProjectPartId, ProjectPartPch,
    SourceDependency, SourceEntry, SourceLocationKind, SourceType, SymbolEntry, SymbolKind,
    SymbolTags, UsedMacro,
};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::error::StorageError;
use crate::schema;
use crate::transaction::WriteTransaction;

/// Stored status of one file of an include closure. `status` is `None` when
/// the file was seen as a dependency but never indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncludedFileStatus {
    pub file_path_id: FilePathId,
    pub status: Option<FileStatus>,
}

/// A location row joined with its symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredLocation {
    pub usr: String,
    pub symbol_name: String,
    pub file_path_id: FilePathId,
    pub line: u32,
    pub column: u32,
    pub kind: SourceLocationKind,
}

/// SQLite-backed symbol database.
///
/// Reads go through `&self`; writes happen inside a [`WriteTransaction`]
/// opened with [`SymbolDatabase::begin_immediate`].
pub struct SymbolDatabase {
    conn: Connection,
}

impl SymbolDatabase {
    /// Open or create a database at `db_path`.
    ///
    /// Returns [`StorageError::SchemaMismatch`] when the file was written by
    /// a different schema version.
    pub fn open(db_path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(db_path)?;
        schema::prepare(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        schema::prepare(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Start a write transaction that takes the database write lock up front.
    pub fn begin_immediate(&mut self) -> Result<WriteTransaction<'_>, StorageError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(WriteTransaction::new(tx))
    }

    // -----------------------------------------------------------------------
    // Project parts
    // -----------------------------------------------------------------------

    /// Stored configuration of a project part, if it was ever indexed.
    pub fn fetch_project_part_artefact(
        &self,
        project_part_id: ProjectPartId,
    ) -> Result<Option<ProjectPartArtefact>, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT compiler_arguments, compiler_macros, include_search_paths, language
             FROM project_parts WHERE id = ?1",
        )?;
        let row = stmt
            .query_row(params![project_part_id.0], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, u8>(3)?,
                ))
            })
            .optional()?;

        let Some((arguments, macros, paths, language)) = row else {
            return Ok(None);
        };
        let language = Language::from_ordinal(language).ok_or_else(|| StorageError::InvalidRowData {
            reason: format!("invalid language ordinal {language}"),
        })?;
        let artefact =
            ProjectPartArtefact::from_json(project_part_id, &arguments, &macros, &paths, language)?;
        Ok(Some(artefact))
    }

    pub fn fetch_project_part_ids(&self) -> Result<Vec<ProjectPartId>, StorageError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id FROM project_parts ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| Ok(ProjectPartId(row.get(0)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    pub fn fetch_project_part_sources(
        &self,
        project_part_id: ProjectPartId,
    ) -> Result<Vec<SourceEntry>, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT p.file_id, p.source_type, p.has_missing_includes, COALESCE(s.last_modified, 0)
             FROM project_part_sources p
             LEFT JOIN file_statuses s ON s.file_id = p.file_id
             WHERE p.project_part_id = ?1
             ORDER BY p.file_id",
        )?;
        let rows = stmt
            .query_map(params![project_part_id.0], |row| {
                Ok((
                    row.get::<_, i32>(0)?,
                    row.get::<_, u8>(1)?,
                    row.get::<_, bool>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(file_id, source_type, missing, last_modified)| {
                Ok(SourceEntry {
                    file_path_id: FilePathId(file_id),
                    source_type: source_type_from_ordinal(source_type)?,
                    last_modified,
                    has_missing_includes: missing.into(),
                })
            })
            .collect()
    }

    /// Project parts that list `file_path_id` as a main source.
    pub fn project_parts_for_source(
        &self,
        file_path_id: FilePathId,
    ) -> Result<Vec<ProjectPartId>, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT project_part_id FROM project_part_sources
             WHERE file_id = ?1 AND source_type = ?2
             ORDER BY project_part_id",
        )?;
        let ids = stmt
            .query_map(params![file_path_id.0, SourceType::Source.ordinal()], |row| {
                Ok(ProjectPartId(row.get(0)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    pub fn fetch_precompiled_header(
        &self,
        project_part_id: ProjectPartId,
    ) -> Result<Option<ProjectPartPch>, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT pch_path, last_modified FROM precompiled_headers WHERE project_part_id = ?1",
        )?;
        let pch = stmt
            .query_row(params![project_part_id.0], |row| {
                Ok(ProjectPartPch {
                    project_part_id,
                    pch_path: row.get(0)?,
                    last_modified: row.get(1)?,
                })
            })
            .optional()?;
        Ok(pch)
    }

    // -----------------------------------------------------------------------
    // File statuses and dependencies
    // -----------------------------------------------------------------------

    pub fn fetch_file_status(
        &self,
        file_path_id: FilePathId,
    ) -> Result<Option<FileStatus>, StorageError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT size, last_modified FROM file_statuses WHERE file_id = ?1")?;
        let status = stmt
            .query_row(params![file_path_id.0], |row| {
                Ok(FileStatus {
                    file_path_id,
                    size: row.get::<_, i64>(0)? as u64,
                    last_modified: row.get(1)?,
                })
            })
            .optional()?;
        Ok(status)
    }

    /// `file_path_id` and every file it transitively includes, each with its
    /// stored status. Cycles in the include graph are fine.
    pub fn fetch_closure_file_statuses(
        &self,
        file_path_id: FilePathId,
    ) -> Result<Vec<IncludedFileStatus>, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            "WITH RECURSIVE closure(file_id) AS (
                 SELECT ?1
                 UNION
                 SELECT d.dependency_file_id
                 FROM source_dependencies d
                 JOIN closure c ON d.file_id = c.file_id
             )
             SELECT c.file_id, s.size, s.last_modified
             FROM closure c
             LEFT JOIN file_statuses s ON s.file_id = c.file_id
             ORDER BY c.file_id",
        )?;
        let statuses = stmt
            .query_map(params![file_path_id.0], |row| {
                let id = FilePathId(row.get(0)?);
                let size: Option<i64> = row.get(1)?;
                let last_modified: Option<i64> = row.get(2)?;
                Ok(IncludedFileStatus {
                    file_path_id: id,
                    status: size.zip(last_modified).map(|(size, last_modified)| FileStatus {
                        file_path_id: id,
                        size: size as u64,
                        last_modified,
                    }),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(statuses)
    }

    /// Main sources (with their project part) whose include closure
    /// contains `file_path_id`, including `file_path_id` itself.
    pub fn fetch_dependent_sources(
        &self,
        file_path_id: FilePathId,
    ) -> Result<Vec<(FilePathId, ProjectPartId)>, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            "WITH RECURSIVE dependents(file_id) AS (
                 SELECT ?1
                 UNION
                 SELECT d.file_id
                 FROM source_dependencies d
                 JOIN dependents x ON d.dependency_file_id = x.file_id
             )
             SELECT DISTINCT p.file_id, p.project_part_id
             FROM dependents x
             JOIN project_part_sources p ON p.file_id = x.file_id
             WHERE p.source_type = ?2
             ORDER BY p.file_id, p.project_part_id",
        )?;
        let rows = stmt
            .query_map(params![file_path_id.0, SourceType::Source.ordinal()], |row| {
                Ok((FilePathId(row.get(0)?), ProjectPartId(row.get(1)?)))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn fetch_source_dependencies(
        &self,
        file_path_id: FilePathId,
    ) -> Result<Vec<SourceDependency>, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT dependency_file_id FROM source_dependencies
             WHERE file_id = ?1 ORDER BY dependency_file_id",
        )?;
        let deps = stmt
            .query_map(params![file_path_id.0], |row| {
                Ok(SourceDependency::new(file_path_id, FilePathId(row.get(0)?)))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(deps)
    }

    pub fn fetch_used_macros(
        &self,
        file_path_id: FilePathId,
    ) -> Result<Vec<UsedMacro>, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT macro_name FROM used_macros WHERE file_id = ?1 ORDER BY macro_name",
        )?;
        let macros = stmt
            .query_map(params![file_path_id.0], |row| {
                Ok(UsedMacro::new(row.get::<_, String>(0)?, file_path_id))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(macros)
    }

    // -----------------------------------------------------------------------
    // Symbols
    // -----------------------------------------------------------------------

    pub fn fetch_symbol(&self, usr: &str) -> Result<Option<SymbolEntry>, StorageError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT usr, name, kind, tags FROM symbols WHERE usr = ?1")?;
        let row = stmt
            .query_row(params![usr], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u8>(2)?,
                    row.get::<_, u8>(3)?,
                ))
            })
            .optional()?;
        row.map(|(usr, name, kind, tags)| symbol_from_row(usr, name, kind, tags))
            .transpose()
    }

    pub fn fetch_symbols_by_name(&self, name: &str) -> Result<Vec<SymbolEntry>, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT usr, name, kind, tags FROM symbols WHERE name = ?1 ORDER BY usr",
        )?;
        let rows = stmt
            .query_map(params![name], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u8>(2)?,
                    row.get::<_, u8>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(usr, name, kind, tags)| symbol_from_row(usr, name, kind, tags))
            .collect()
    }

    /// Every location of the symbol with `usr`, ordered by file and position.
    pub fn fetch_symbol_locations(&self, usr: &str) -> Result<Vec<StoredLocation>, StorageError> {
        self.query_locations(
            "SELECT s.usr, s.name, l.file_id, l.line, l.column, l.kind
             FROM locations l JOIN symbols s ON s.id = l.symbol_id
             WHERE s.usr = ?1
             ORDER BY l.file_id, l.line, l.column",
            usr,
        )
    }

    pub fn fetch_locations_in_file(
        &self,
        file_path_id: FilePathId,
    ) -> Result<Vec<StoredLocation>, StorageError> {
        self.query_locations(
            "SELECT s.usr, s.name, l.file_id, l.line, l.column, l.kind
             FROM locations l JOIN symbols s ON s.id = l.symbol_id
             WHERE l.file_id = ?1
             ORDER BY l.line, l.column, s.usr",
            file_path_id.0,
        )
    }

    pub fn count_symbols(&self) -> Result<usize, StorageError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM symbols", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn count_locations(&self) -> Result<usize, StorageError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM locations", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    fn query_locations(
        &self,
        sql: &str,
        key: impl rusqlite::ToSql,
    ) -> Result<Vec<StoredLocation>, StorageError> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map(params![key], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i32>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, u32>(4)?,
                    row.get::<_, u8>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(usr, symbol_name, file_id, line, column, kind)| {
                let kind =
                    SourceLocationKind::from_ordinal(kind).ok_or_else(|| StorageError::InvalidRowData {
                        reason: format!("invalid location kind ordinal {kind}"),
                    })?;
                Ok(StoredLocation {
                    usr,
                    symbol_name,
                    file_path_id: FilePathId(file_id),
                    line,
                    column,
                    kind,
                })
            })
            .collect()
    }
}

fn symbol_from_row(
    usr: String,
    name: String,
    kind: u8,
    tags: u8,
) -> Result<SymbolEntry, StorageError> {
    let kind = SymbolKind::from_ordinal(kind).ok_or_else(|| StorageError::InvalidRowData {
        reason: format!("invalid symbol kind ordinal {kind}"),
    })?;
    Ok(SymbolEntry::new(usr, name, kind).with_tags(SymbolTags::from_bits_truncate(tags)))
}

fn source_type_from_ordinal(ordinal: u8) -> Result<SourceType, StorageError> {
    SourceType::from_ordinal(ordinal).ok_or_else(|| StorageError::InvalidRowData {
        reason: format!("invalid source type ordinal {ordinal}"),
    })
}
