use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

/// Key of a path inside range and location containers: XXH3-64 of the
/// normalized path.
pub fn file_hash(path: &str) -> u64 {
    xxh3_64(path.as_bytes())
}

/// A position in a text. `line` and `column` are 1-based (columns count
/// bytes), `offset` is the 0-based byte offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
    pub offset: u32,
}

impl SourceLocation {
    pub fn new(line: u32, column: u32, offset: u32) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }

    /// Compute line and column of a byte offset in `text`.
    /// Offsets past the end are clamped.
    pub fn from_offset(text: &str, offset: usize) -> Self {
        let offset = offset.min(text.len());
        let before = &text.as_bytes()[..offset];
        let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
        let line_start = before
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |pos| pos + 1);
        Self {
            line: line as u32,
            column: (offset - line_start + 1) as u32,
            offset: offset as u32,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    pub start: SourceLocation,
    pub end: SourceLocation,
}

impl SourceRange {
    pub fn new(start: SourceLocation, end: SourceLocation) -> Self {
        Self { start, end }
    }
}

/// A matched range plus the text of the lines it spans.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceRangeWithText {
    pub file_hash: u64,
    pub range: SourceRange,
    pub text: String,
}

/// Ranges over a set of files together with the table resolving their
/// `file_hash` keys to paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRangesContainer {
    pub file_paths: BTreeMap<u64, String>,
    pub ranges: Vec<SourceRangeWithText>,
}

impl SourceRangesContainer {
    pub fn insert_file_path(&mut self, path: &str) -> u64 {
        let hash = file_hash(path);
        self.file_paths
            .entry(hash)
            .or_insert_with(|| path.to_string());
        hash
    }

    pub fn push(&mut self, path: &str, range: SourceRange, text: String) {
        let file_hash = self.insert_file_path(path);
        self.ranges.push(SourceRangeWithText {
            file_hash,
            range,
            text,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Append `other`, keeping ranges sorted and unique.
    pub fn merge(&mut self, other: SourceRangesContainer) {
        self.file_paths.extend(other.file_paths);
        self.ranges.extend(other.ranges);
        self.ranges.sort();
        self.ranges.dedup();
    }

    pub fn path_of(&self, range: &SourceRangeWithText) -> Option<&str> {
        self.file_paths.get(&range.file_hash).map(String::as_str)
    }
}

/// A location keyed by file hash, as produced for renaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileLocation {
    pub file_hash: u64,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocationsContainer {
    pub file_paths: BTreeMap<u64, String>,
    pub locations: Vec<FileLocation>,
}

impl SourceLocationsContainer {
    pub fn push(&mut self, path: &str, location: SourceLocation) {
        let hash = file_hash(path);
        self.file_paths
            .entry(hash)
            .or_insert_with(|| path.to_string());
        self.locations.push(FileLocation {
            file_hash: hash,
            location,
        });
    }

    /// Sort and drop duplicates.
    pub fn finish(&mut self) {
        self.locations.sort();
        self.locations.dedup();
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_from_offset() {
        let text = "int a;\nint bc;\n";
        assert_eq!(SourceLocation::from_offset(text, 0), SourceLocation::new(1, 1, 0));
        assert_eq!(SourceLocation::from_offset(text, 11), SourceLocation::new(2, 5, 11));
        assert_eq!(SourceLocation::from_offset(text, 999).offset, text.len() as u32);
    }

    #[test]
    fn ranges_share_path_table() {
        let mut container = SourceRangesContainer::default();
        let r = SourceRange::new(SourceLocation::new(1, 1, 0), SourceLocation::new(1, 4, 3));
        container.push("/a.cpp", r, "int a;".into());
        container.push("/a.cpp", r, "int a;".into());
        assert_eq!(container.file_paths.len(), 1);
        assert_eq!(container.path_of(&container.ranges[0]), Some("/a.cpp"));
    }

    #[test]
    fn merge_deduplicates() {
        let r = SourceRange::new(SourceLocation::new(1, 1, 0), SourceLocation::new(1, 4, 3));
        let mut a = SourceRangesContainer::default();
        a.push("/a.cpp", r, "x".into());
        let b = a.clone();
        a.merge(b);
        assert_eq!(a.ranges.len(), 1);
    }

    #[test]
    fn locations_finish_sorts() {
        let mut locations = SourceLocationsContainer::default();
        locations.push("/a.cpp", SourceLocation::new(3, 1, 20));
        locations.push("/a.cpp", SourceLocation::new(1, 1, 0));
        locations.push("/a.cpp", SourceLocation::new(1, 1, 0));
        locations.finish();
        assert_eq!(locations.locations.len(), 2);
        assert_eq!(locations.locations[0].location.line, 1);
    }
}
