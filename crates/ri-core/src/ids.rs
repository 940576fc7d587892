use std::fmt;

use serde::{Deserialize, Serialize};

/// Interned identifier of an absolute, normalized file path.
///
/// Assigned by a [`crate::FilePathCaching`] implementation. The same path maps to
/// the same id for the lifetime of the cache.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FilePathId(pub i32);

impl FilePathId {
    /// Ids start at 1; 0 never names a file.
    pub fn is_valid(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Debug for FilePathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FilePathId({})", self.0)
    }
}

impl fmt::Display for FilePathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one compilable configuration inside a project.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ProjectPartId(pub i32);

impl fmt::Debug for ProjectPartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProjectPartId({})", self.0)
    }
}

impl fmt::Display for ProjectPartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a symbol within one collection pass.
///
/// Only meaningful inside the pass that produced it; the USR stored in the
/// matching [`crate::SymbolEntry`] is the cross-run identity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolIndex(pub u64);

impl fmt::Debug for SymbolIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolIndex({})", self.0)
    }
}
