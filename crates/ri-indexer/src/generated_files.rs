use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use ri_core::{normalize_path, FileContainer};

/// In-memory files (generated sources, unsaved editor buffers) that shadow
/// the file system for every collector leased afterwards.
#[derive(Debug, Default)]
pub struct GeneratedFiles {
    files: RwLock<BTreeMap<String, FileContainer>>,
}

impl GeneratedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace files by path.
    pub fn update(&self, files: Vec<FileContainer>) {
        let mut map = self.files.write().unwrap_or_else(PoisonError::into_inner);
        for mut file in files {
            file.file_path = normalize_path(&file.file_path);
            map.insert(file.file_path.clone(), file);
        }
    }

    pub fn remove(&self, paths: &[String]) {
        let mut map = self.files.write().unwrap_or_else(PoisonError::into_inner);
        for path in paths {
            map.remove(&normalize_path(path));
        }
    }

    /// All files, ordered by path.
    pub fn snapshot(&self) -> Vec<FileContainer> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn file_paths(&self) -> Vec<String> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_replaces_by_normalized_path() {
        let files = GeneratedFiles::new();
        files.update(vec![FileContainer::new("/p/./gen.h", "int a;")]);
        files.update(vec![
            FileContainer::new("/p/gen.h", "int b;"),
            FileContainer::new("/p/api.h", ""),
        ]);

        let snapshot = files.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].file_path, "/p/api.h");
        assert_eq!(snapshot[1].content, "int b;");
    }

    #[test]
    fn remove_drops_files() {
        let files = GeneratedFiles::new();
        files.update(vec![FileContainer::new("/p/gen.h", "")]);
        files.remove(&["/p/gen.h".to_string(), "/p/other.h".to_string()]);
        assert!(files.is_empty());
    }
}
