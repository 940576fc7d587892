use serde::{Deserialize, Serialize};

use crate::ids::FilePathId;

/// A macro name referenced from a file, whether or not it is defined there.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UsedMacro {
    pub macro_name: String,
    pub file_path_id: FilePathId,
}

impl UsedMacro {
    pub fn new(macro_name: impl Into<String>, file_path_id: FilePathId) -> Self {
        Self {
            macro_name: macro_name.into(),
            file_path_id,
        }
    }
}

/// Size and modification time of a file observed during a pass.
///
/// Ordered and compared by `file_path_id` only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FileStatus {
    pub file_path_id: FilePathId,
    pub size: u64,
    /// Seconds since the Unix epoch.
    pub last_modified: i64,
}

impl PartialEq for FileStatus {
    fn eq(&self, other: &Self) -> bool {
        self.file_path_id == other.file_path_id
    }
}

impl Eq for FileStatus {}

impl PartialOrd for FileStatus {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FileStatus {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.file_path_id.cmp(&other.file_path_id)
    }
}

/// An include edge: `file_path_id` includes `dependency_file_path_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceDependency {
    pub file_path_id: FilePathId,
    pub dependency_file_path_id: FilePathId,
}

impl SourceDependency {
    pub fn new(file_path_id: FilePathId, dependency_file_path_id: FilePathId) -> Self {
        Self {
            file_path_id,
            dependency_file_path_id,
        }
    }
}

/// How a file entered a translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SourceType {
    Source = 0,
    UserInclude = 1,
    SystemInclude = 2,
}

impl SourceType {
    pub fn from_ordinal(n: u8) -> Option<Self> {
        match n {
            0 => Some(Self::Source),
            1 => Some(Self::UserInclude),
            2 => Some(Self::SystemInclude),
            _ => None,
        }
    }

    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HasMissingIncludes {
    #[default]
    No,
    Yes,
}

impl HasMissingIncludes {
    pub fn is_yes(self) -> bool {
        self == Self::Yes
    }
}

impl From<bool> for HasMissingIncludes {
    fn from(value: bool) -> Self {
        if value {
            Self::Yes
        } else {
            Self::No
        }
    }
}

/// Per-file summary of a pass: how the file entered the translation unit and
/// whether it (transitively) depends on an include that could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub file_path_id: FilePathId,
    pub source_type: SourceType,
    pub last_modified: i64,
    pub has_missing_includes: HasMissingIncludes,
}
