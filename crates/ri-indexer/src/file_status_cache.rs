use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::UNIX_EPOCH;

use ri_core::{FilePathCaching, FilePathId, FileStatus};

/// Current on-disk size and modification time per file id.
///
/// Entries are read lazily and kept until [`FileStatusCache::update`]
/// invalidates them.
pub struct FileStatusCache {
    paths: Arc<dyn FilePathCaching>,
    statuses: RwLock<HashMap<FilePathId, FileStatus>>,
}

impl FileStatusCache {
    pub fn new(paths: Arc<dyn FilePathCaching>) -> Self {
        Self {
            paths,
            statuses: RwLock::new(HashMap::new()),
        }
    }

    /// Seconds since the Unix epoch, `None` when the file cannot be read.
    pub fn last_modified(&self, file_path_id: FilePathId) -> Option<i64> {
        self.file_status(file_path_id).map(|s| s.last_modified)
    }

    pub fn file_status(&self, file_path_id: FilePathId) -> Option<FileStatus> {
        {
            let statuses = self.statuses.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(status) = statuses.get(&file_path_id) {
                return Some(*status);
            }
        }

        let status = self.stat(file_path_id)?;
        self.statuses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(file_path_id, status);
        Some(status)
    }

    /// Forget what is known about `file_path_id`.
    pub fn update(&self, file_path_id: FilePathId) {
        self.update_many(&[file_path_id]);
    }

    pub fn update_many(&self, file_path_ids: &[FilePathId]) {
        let mut statuses = self.statuses.write().unwrap_or_else(PoisonError::into_inner);
        for id in file_path_ids {
            statuses.remove(id);
        }
    }

    fn stat(&self, file_path_id: FilePathId) -> Option<FileStatus> {
        let path = self.paths.file_path(file_path_id)?;
        let metadata = fs::metadata(&path).ok()?;
        let last_modified = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_secs() as i64);
        Some(FileStatus {
            file_path_id,
            size: metadata.len(),
            last_modified,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use ri_core::normalize_path;
    use ri_storage::FilePathCache;

    use super::*;

    #[test]
    fn reads_and_invalidates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.c");
        fs::write(&path, "int a;").unwrap();
        let file = fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(UNIX_EPOCH + Duration::from_secs(1_000)).unwrap();

        let paths = Arc::new(FilePathCache::in_memory());
        let id = paths.file_path_id(&normalize_path(&path.to_string_lossy()));
        let cache = FileStatusCache::new(paths);

        assert_eq!(cache.last_modified(id), Some(1_000));
        assert_eq!(cache.file_status(id).unwrap().size, 6);

        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(2_000))
            .unwrap();
        assert_eq!(cache.last_modified(id), Some(1_000));
        cache.update(id);
        assert_eq!(cache.last_modified(id), Some(2_000));
    }

    #[test]
    fn missing_file_has_no_status() {
        let paths = Arc::new(FilePathCache::in_memory());
        let id = paths.file_path_id("/definitely/not/here.c");
        let cache = FileStatusCache::new(paths);
        assert_eq!(cache.file_status(id), None);
    }
}
