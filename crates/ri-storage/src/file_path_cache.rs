use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, PoisonError, RwLock};

use ri_core::{FilePathCaching, FilePathId};
use rusqlite::{params, Connection};

use crate::error::StorageError;
use crate::schema;

#[derive(Default)]
struct Interned {
    ids: HashMap<String, FilePathId>,
    paths: HashMap<FilePathId, String>,
    next_id: i32,
}

impl Interned {
    fn insert(&mut self, path: String, id: FilePathId) {
        self.next_id = self.next_id.max(id.0 + 1);
        self.paths.insert(id, path.clone());
        self.ids.insert(path, id);
    }
}

/// Path interning cache, optionally persisted to the `file_paths` table so
/// ids survive restarts.
///
/// Lookups of known paths only take the read lock.
pub struct FilePathCache {
    conn: Option<Mutex<Connection>>,
    state: RwLock<Interned>,
}

impl FilePathCache {
    /// Open a cache backed by the database at `db_path`, preloading every
    /// stored path.
    pub fn open(db_path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(db_path)?;
        schema::configure_pragmas(&conn)?;
        schema::create_schema(&conn)?;

        let mut state = Interned {
            next_id: 1,
            ..Default::default()
        };
        {
            let mut stmt = conn.prepare("SELECT id, path FROM file_paths")?;
            let rows = stmt.query_map([], |row| {
                Ok((FilePathId(row.get(0)?), row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (id, path) = row?;
                state.insert(path, id);
            }
        }
        tracing::debug!(paths = state.ids.len(), "file path cache loaded");

        Ok(Self {
            conn: Some(Mutex::new(conn)),
            state: RwLock::new(state),
        })
    }

    /// A cache that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            conn: None,
            state: RwLock::new(Interned {
                next_id: 1,
                ..Default::default()
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .ids
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn persist(&self, id: FilePathId, path: &str) -> Result<(), StorageError> {
        let Some(conn) = &self.conn else {
            return Ok(());
        };
        let conn = conn.lock().map_err(|e| StorageError::TransactionFailed {
            reason: format!("file path connection lock poisoned: {e}"),
        })?;
        conn.prepare_cached("INSERT OR IGNORE INTO file_paths (id, path) VALUES (?1, ?2)")?
            .execute(params![id.0, path])?;
        Ok(())
    }
}

impl FilePathCaching for FilePathCache {
    fn file_path_id(&self, path: &str) -> FilePathId {
        if let Some(id) = self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .ids
            .get(path)
        {
            return *id;
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(id) = state.ids.get(path) {
            return *id;
        }
        let id = FilePathId(state.next_id);
        if let Err(e) = self.persist(id, path) {
            // the id stays valid for this process; it is reassigned on restart
            tracing::warn!(path, error = %e, "failed to persist file path");
        }
        state.insert(path.to_string(), id);
        id
    }

    fn file_path(&self, id: FilePathId) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .paths
            .get(&id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_path_same_id() {
        let cache = FilePathCache::in_memory();
        let a = cache.file_path_id("/p/a.cpp");
        let b = cache.file_path_id("/p/b.h");
        assert_ne!(a, b);
        assert!(a.is_valid());
        assert_eq!(cache.file_path_id("/p/a.cpp"), a);
        assert_eq!(cache.file_path(b).as_deref(), Some("/p/b.h"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn ids_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("paths.db");

        let first = {
            let cache = FilePathCache::open(&db).unwrap();
            cache.file_path_id("/p/a.cpp");
            cache.file_path_id("/p/b.cpp")
        };

        let cache = FilePathCache::open(&db).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.file_path_id("/p/b.cpp"), first);
        let fresh = cache.file_path_id("/p/c.cpp");
        assert!(fresh.0 > first.0);
    }

    #[test]
    fn concurrent_interning_is_consistent() {
        let cache = std::sync::Arc::new(FilePathCache::in_memory());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    (0..50)
                        .map(|i| cache.file_path_id(&format!("/p/{i}.h")))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let results: Vec<Vec<FilePathId>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(cache.len(), 50);
    }
}
