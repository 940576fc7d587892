use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use ri_core::{normalize_path, Language};
use ri_parser::ParserRegistry;

/// Vendor directories to skip.
pub(crate) const VENDOR_DIRS: &[&str] = &["third_party", "external", "node_modules", "build"];

/// C/C++ files found under a project directory.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Normalized absolute paths of main sources, sorted.
    pub sources: Vec<String>,
    /// Normalized absolute paths of headers, sorted.
    pub headers: Vec<String>,
    /// Total entries seen (including skipped).
    pub total_entries: usize,
}

impl ScanResult {
    pub fn file_count(&self) -> usize {
        self.sources.len() + self.headers.len()
    }
}

/// Scan a project directory for C/C++ sources and headers.
///
/// `.gitignore`-aware; hidden entries, vendor directories and symlinks are
/// skipped.
pub fn scan_files(project_root: &Path) -> ScanResult {
    let root = project_root
        .canonicalize()
        .unwrap_or_else(|_| project_root.to_path_buf());
    let mut result = ScanResult::default();

    let walker = WalkBuilder::new(&root)
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .follow_links(false)
        .filter_entry(|entry| {
            if entry.file_type().is_some_and(|ft| ft.is_dir()) {
                if let Some(name) = entry.file_name().to_str() {
                    return !VENDOR_DIRS.contains(&name);
                }
            }
            true
        })
        .build();

    for entry in walker {
        let Ok(entry) = entry else {
            continue;
        };
        result.total_entries += 1;

        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let path = normalize_path(&entry.path().to_string_lossy());
        if !ParserRegistry::is_indexable_path(&path) {
            continue;
        }
        if is_source_path(Path::new(&path)) {
            result.sources.push(path);
        } else {
            result.headers.push(path);
        }
    }

    result.sources.sort();
    result.headers.sort();
    tracing::debug!(
        sources = result.sources.len(),
        headers = result.headers.len(),
        entries = result.total_entries,
        "scan finished"
    );
    result
}

/// A main file, as opposed to a header.
pub fn is_source_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| Language::from_extension(&ext.to_ascii_lowercase()).is_some())
}

/// `root` joined with `relative`, normalized.
pub(crate) fn absolute(root: &Path, relative: &Path) -> PathBuf {
    PathBuf::from(normalize_path(&root.join(relative).to_string_lossy()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scan_empty_dir() {
        let tmp = tempfile::TempDir::new().unwrap();
        let result = scan_files(tmp.path());
        assert_eq!(result.file_count(), 0);
    }

    #[test]
    fn scan_splits_sources_and_headers() {
        let tmp = tempfile::TempDir::new().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("main.cpp"), "int main() {}").unwrap();
        fs::write(src.join("util.c"), "int util;").unwrap();
        fs::write(src.join("util.h"), "int util;").unwrap();
        fs::write(src.join("notes.txt"), "hello").unwrap();

        let result = scan_files(tmp.path());
        assert_eq!(result.sources.len(), 2);
        assert_eq!(result.headers.len(), 1);
        assert!(result.sources.iter().all(|p| p.starts_with('/')));
        assert!(result.headers[0].ends_with("src/util.h"));
    }

    #[test]
    fn scan_skips_vendor_and_hidden_dirs() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::write(tmp.path().join("app.c"), "int x;").unwrap();
        let vendored = tmp.path().join("third_party").join("zlib");
        fs::create_dir_all(&vendored).unwrap();
        fs::write(vendored.join("zlib.c"), "int z;").unwrap();
        let hidden = tmp.path().join(".cache");
        fs::create_dir_all(&hidden).unwrap();
        fs::write(hidden.join("tmp.c"), "int t;").unwrap();

        let result = scan_files(tmp.path());
        assert_eq!(result.sources.len(), 1);
        assert!(result.sources[0].ends_with("app.c"));
    }

    #[test]
    fn scan_respects_gitignore() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::process::Command::new("git")
            .args(["init"])
            .current_dir(tmp.path())
            .output()
            .ok();
        fs::write(tmp.path().join(".gitignore"), "generated/\n").unwrap();
        fs::write(tmp.path().join("app.cpp"), "int x;").unwrap();
        let generated = tmp.path().join("generated");
        fs::create_dir_all(&generated).unwrap();
        fs::write(generated.join("moc_app.cpp"), "int y;").unwrap();

        let result = scan_files(tmp.path());
        assert!(result.sources.iter().any(|p| p.ends_with("app.cpp")));
        assert!(!result.sources.iter().any(|p| p.contains("moc_app")));
    }

    #[test]
    fn source_paths() {
        assert!(is_source_path(Path::new("/a/b.cc")));
        assert!(is_source_path(Path::new("/a/b.C")));
        assert!(!is_source_path(Path::new("/a/b.hpp")));
    }
}
