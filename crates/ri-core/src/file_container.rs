use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

/// In-memory file content that shadows the file system: editor buffers and
/// generated sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContainer {
    /// Absolute, forward-slash normalized path.
    pub file_path: String,
    pub content: String,
    /// Front-end arguments used when the file is parsed as a main file.
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub document_revision: u32,
}

impl FileContainer {
    pub fn new(file_path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            content: content.into(),
            arguments: Vec::new(),
            document_revision: 0,
        }
    }

    pub fn with_arguments(mut self, arguments: Vec<String>) -> Self {
        self.arguments = arguments;
        self
    }

    /// XXH3-64 of the content bytes.
    pub fn content_hash(&self) -> u64 {
        xxh3_64(self.content.as_bytes())
    }
}
