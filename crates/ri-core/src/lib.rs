mod error;
mod file_container;
mod file_path;
mod ids;
mod language;
mod project_part;
mod source;
mod source_range;
mod symbol;

pub use error::CoreError;
pub use file_container::FileContainer;
pub use file_path::{normalize_path, FilePathCaching};
pub use ids::{FilePathId, ProjectPartId, SymbolIndex};
pub use language::Language;
pub use project_part::{
    CompilerMacro, IncludeSearchPath, IncludeSearchPathType, ProjectPartArtefact,
    ProjectPartContainer, ProjectPartPch,
};
pub use source::{
    FileStatus, HasMissingIncludes, SourceDependency, SourceEntry, SourceType, UsedMacro,
};
pub use source_range::{
    file_hash, FileLocation, SourceLocation, SourceLocationsContainer, SourceRange,
    SourceRangeWithText, SourceRangesContainer,
};
pub use symbol::{
    SourceLocationEntries, SourceLocationEntry, SourceLocationKind, SymbolEntries, SymbolEntry,
    SymbolKind, SymbolTags,
};
