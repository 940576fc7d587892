use crate::ids::FilePathId;

/// Interns absolute file paths to [`FilePathId`]s.
///
/// Implementations are shared between the control thread and indexing
/// workers, so lookups take `&self`.
pub trait FilePathCaching: Send + Sync {
    /// Return the id of `path`, assigning a new one on first sight.
    /// `path` must already be normalized with [`normalize_path`].
    fn file_path_id(&self, path: &str) -> FilePathId;

    /// Reverse lookup.
    fn file_path(&self, id: FilePathId) -> Option<String>;
}

/// Lexically normalize a path: forward slashes, no `.` segments, `..`
/// folded into the parent, no duplicate separators.
///
/// The file system is not consulted, so symlinks are left alone.
pub fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(segments.last(), Some(last) if *last != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_dot_segments() {
        assert_eq!(normalize_path("/a/./b//c"), "/a/b/c");
    }

    #[test]
    fn folds_parent_segments() {
        assert_eq!(normalize_path("/a/b/../c"), "/a/c");
        assert_eq!(normalize_path("/../a"), "/a");
        assert_eq!(normalize_path("a/../../b"), "../b");
    }

    #[test]
    fn converts_backslashes() {
        assert_eq!(normalize_path("C:\\src\\main.cpp"), "C:/src/main.cpp");
    }

    #[test]
    fn empty_relative_is_dot() {
        assert_eq!(normalize_path("a/.."), ".");
    }
}
