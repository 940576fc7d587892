use ri_core::{SourceType, SymbolKind, SymbolTags};

use crate::macros::{MacroDefinition, MacroTable};

/// Identity of a file within one front-end run. Stable for the duration of
/// the run only; collectors map it to a persistent id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileUid(pub u32);

/// Identity of a canonical declaration within one front-end run. Forward
/// declarations, redeclarations and the definition share one id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeclId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub uid: FileUid,
    /// Normalized absolute path.
    pub path: String,
    pub size: u64,
    /// Seconds since the Unix epoch; 0 for buffers without a file on disk.
    pub last_modified: i64,
    pub is_system: bool,
}

/// 1-based line and column of a token start, plus its byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location {
    pub file: FileUid,
    pub line: u32,
    pub column: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OccurrenceRole {
    Declaration,
    Definition,
    Reference,
}

pub struct InclusionDirective<'a> {
    pub includer: &'a SourceFile,
    pub spelled_name: &'a str,
    pub is_angled: bool,
    /// `None` when the include could not be resolved.
    pub file: Option<&'a SourceFile>,
    pub location: Location,
}

/// A macro name as it appears in `#ifdef`, `defined(...)` or an expansion.
pub struct MacroNameToken<'a> {
    pub name: &'a str,
    pub location: Location,
    /// The definition in effect at the token, if any.
    pub definition: Option<&'a MacroDefinition>,
}

pub struct DeclOccurrence<'a> {
    pub decl: DeclId,
    pub usr: &'a str,
    pub name: &'a str,
    pub kind: SymbolKind,
    pub tags: SymbolTags,
    pub role: OccurrenceRole,
    pub location: Location,
    /// Whether the canonical declaration lives in a system header.
    pub in_system_header: bool,
}

/// Events delivered by the front end while it walks a translation unit.
///
/// Events arrive in source order with includes expanded in place. Every
/// method has an empty default.
#[allow(unused_variables)]
pub trait FrontEndCallbacks {
    /// A file's contents are about to be processed.
    fn file_entered(&mut self, file: &SourceFile, source_type: SourceType) {}

    /// An include resolved to `file` but was not entered (include guard or
    /// `#pragma once`).
    fn file_skipped(&mut self, file: &SourceFile) {}

    fn inclusion_directive(&mut self, directive: &InclusionDirective<'_>) {}

    fn macro_defined(&mut self, definition: &MacroDefinition) {}

    fn macro_undefined(&mut self, token: &MacroNameToken<'_>) {}

    fn macro_expands(&mut self, token: &MacroNameToken<'_>) {}

    fn ifdef(&mut self, token: &MacroNameToken<'_>) {}

    fn ifndef(&mut self, token: &MacroNameToken<'_>) {}

    fn defined(&mut self, token: &MacroNameToken<'_>) {}

    /// A declaration, definition or reference of a named entity.
    fn occurrence(&mut self, occurrence: &DeclOccurrence<'_>) {}

    /// Called once after the main file has been fully processed.
    fn end_of_main_file(&mut self, macros: &MacroTable) {}
}
