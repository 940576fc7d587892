use rusqlite::Connection;

use crate::error::StorageError;

/// Current schema version. Increment when schema changes.
pub(crate) const SCHEMA_VERSION: u32 = 1;

pub(crate) fn configure_pragmas(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;\
         PRAGMA busy_timeout = 5000;\
         PRAGMA synchronous = NORMAL;\
         PRAGMA foreign_keys = ON;",
    )?;
    Ok(())
}

pub(crate) fn get_user_version(conn: &Connection) -> Result<u32, StorageError> {
    let v: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(v)
}

pub(crate) fn set_user_version(conn: &Connection, version: u32) -> Result<(), StorageError> {
    conn.pragma_update(None, "user_version", version)?;
    Ok(())
}

/// Check the stored version, then create missing tables. A fresh database
/// reports version 0.
pub(crate) fn prepare(conn: &Connection) -> Result<(), StorageError> {
    configure_pragmas(conn)?;
    let stored_version = get_user_version(conn)?;
    if stored_version != 0 && stored_version != SCHEMA_VERSION {
        return Err(StorageError::SchemaMismatch {
            expected: SCHEMA_VERSION,
            actual: stored_version,
        });
    }
    create_schema(conn)?;
    set_user_version(conn, SCHEMA_VERSION)
}

pub(crate) fn create_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS file_paths (
            id          INTEGER PRIMARY KEY,
            path        TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS symbols (
            id          INTEGER PRIMARY KEY,
            usr         TEXT NOT NULL UNIQUE,
            name        TEXT NOT NULL,
            kind        INTEGER NOT NULL,
            tags        INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_symbols_name ON symbols(name);

        CREATE TABLE IF NOT EXISTS locations (
            symbol_id   INTEGER NOT NULL REFERENCES symbols(id) ON DELETE CASCADE,
            file_id     INTEGER NOT NULL,
            line        INTEGER NOT NULL,
            column      INTEGER NOT NULL,
            kind        INTEGER NOT NULL,
            UNIQUE(file_id, line, column, symbol_id)
        );

        CREATE INDEX IF NOT EXISTS idx_locations_symbol ON locations(symbol_id);

        CREATE TABLE IF NOT EXISTS project_parts (
            id                   INTEGER PRIMARY KEY,
            compiler_arguments   TEXT NOT NULL,
            compiler_macros      TEXT NOT NULL,
            include_search_paths TEXT NOT NULL,
            language             INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS project_part_sources (
            project_part_id      INTEGER NOT NULL,
            file_id              INTEGER NOT NULL,
            source_type          INTEGER NOT NULL,
            has_missing_includes INTEGER NOT NULL,
            PRIMARY KEY(project_part_id, file_id)
        );

        CREATE INDEX IF NOT EXISTS idx_project_part_sources_file ON project_part_sources(file_id);

        CREATE TABLE IF NOT EXISTS used_macros (
            file_id     INTEGER NOT NULL,
            macro_name  TEXT NOT NULL,
            PRIMARY KEY(file_id, macro_name)
        );

        CREATE INDEX IF NOT EXISTS idx_used_macros_name ON used_macros(macro_name);

        CREATE TABLE IF NOT EXISTS file_statuses (
            file_id       INTEGER PRIMARY KEY,
            size          INTEGER NOT NULL,
            last_modified INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS source_dependencies (
            file_id            INTEGER NOT NULL,
            dependency_file_id INTEGER NOT NULL,
            PRIMARY KEY(file_id, dependency_file_id)
        );

        CREATE INDEX IF NOT EXISTS idx_source_dependencies_dependency
            ON source_dependencies(dependency_file_id);

        CREATE TABLE IF NOT EXISTS precompiled_headers (
            project_part_id INTEGER PRIMARY KEY,
            pch_path        TEXT NOT NULL,
            last_modified   INTEGER NOT NULL
        );",
    )?;
    Ok(())
}
