use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::database::SymbolDatabase;
use crate::error::{is_sqlite_corruption, StorageError};
use crate::file_path_cache::FilePathCache;

/// Directory created under the project root.
const STORAGE_DIR: &str = ".ri";

const DB_FILE: &str = "symbols.db";

/// Owns the `.ri/` directory: the symbol database and the persisted path
/// interning cache.
pub struct StorageManager {
    database: SymbolDatabase,
    paths: Arc<FilePathCache>,
    root: PathBuf,
}

impl StorageManager {
    /// Open or create the storage directory at `<project_root>/.ri/`.
    ///
    /// A database with a different schema version or a corrupted file is
    /// purged and re-initialized.
    pub fn open(project_root: &Path) -> Result<Self, StorageError> {
        let root = project_root.join(STORAGE_DIR);

        match Self::try_open(&root) {
            Ok(mgr) => Ok(mgr),
            Err(e) if Self::should_purge(&e) => {
                tracing::warn!(root = %root.display(), error = %e, "purging symbol storage");
                Self::purge(&root)?;
                Self::try_open(&root)
            }
            Err(e) => Err(e),
        }
    }

    fn try_open(root: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(root)?;

        let db_path = root.join(DB_FILE);
        let database = SymbolDatabase::open(&db_path)?;
        let paths = FilePathCache::open(&db_path)?;

        Ok(Self {
            database,
            paths: Arc::new(paths),
            root: root.to_path_buf(),
        })
    }

    fn should_purge(err: &StorageError) -> bool {
        match err {
            StorageError::SchemaMismatch { .. } => true,
            StorageError::Sqlite(e) => is_sqlite_corruption(e),
            _ => false,
        }
    }

    fn purge(root: &Path) -> Result<(), StorageError> {
        if root.exists() {
            std::fs::remove_dir_all(root)?;
        }
        Ok(())
    }

    pub fn database(&self) -> &SymbolDatabase {
        &self.database
    }

    pub fn database_mut(&mut self) -> &mut SymbolDatabase {
        &mut self.database
    }

    pub fn paths(&self) -> &Arc<FilePathCache> {
        &self.paths
    }

    /// The `.ri/` directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn into_parts(self) -> (SymbolDatabase, Arc<FilePathCache>) {
        (self.database, self.paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ri_core::FilePathCaching;
    use tempfile::TempDir;

    #[test]
    fn open_creates_directory_structure() {
        let tmp = TempDir::new().unwrap();
        let mgr = StorageManager::open(tmp.path()).unwrap();

        assert!(mgr.root().exists());
        assert!(mgr.root().join(DB_FILE).exists());
    }

    #[test]
    fn open_idempotent() {
        let tmp = TempDir::new().unwrap();
        let mgr = StorageManager::open(tmp.path()).unwrap();
        let id = mgr.paths().file_path_id("/src/a.cpp");
        drop(mgr);

        let mgr = StorageManager::open(tmp.path()).unwrap();
        assert_eq!(mgr.paths().file_path_id("/src/a.cpp"), id);
    }

    #[test]
    fn corrupted_sqlite_triggers_purge_and_rebuild() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join(STORAGE_DIR);

        let mgr = StorageManager::open(tmp.path()).unwrap();
        drop(mgr);

        std::fs::write(root.join(DB_FILE), b"not a sqlite database").unwrap();
        let _ = std::fs::remove_file(root.join("symbols.db-wal"));
        let _ = std::fs::remove_file(root.join("symbols.db-shm"));

        let mgr = StorageManager::open(tmp.path()).unwrap();
        assert_eq!(mgr.database().count_symbols().unwrap(), 0);
    }

    #[test]
    fn schema_mismatch_triggers_purge() {
        let tmp = TempDir::new().unwrap();
        let mgr = StorageManager::open(tmp.path()).unwrap();
        mgr.database()
            .connection()
            .pragma_update(None, "user_version", 99u32)
            .unwrap();
        mgr.paths().file_path_id("/src/old.cpp");
        drop(mgr);

        let mgr = StorageManager::open(tmp.path()).unwrap();
        assert!(mgr.paths().is_empty());
    }
}
