use std::collections::{HashMap, HashSet};

use ri_core::{
    FilePathCaching, FilePathId, FileStatus, HasMissingIncludes, SourceDependency, SourceEntry,
    SourceLocationEntry, SourceLocationKind, SourceType, SymbolEntry, SymbolKind, UsedMacro,
};
use ri_parser::{
    DeclOccurrence, FileUid, FrontEndCallbacks, InclusionDirective, Location, MacroDefinition,
    MacroNameToken, MacroTable, OccurrenceRole, SourceFile,
};

use crate::collector::tables::CollectedTables;
use crate::sources_manager::SourcesManager;

/// Callbacks of one front-end run, writing into the task's tables.
pub(crate) struct TranslationUnitCollector<'a> {
    paths: &'a dyn FilePathCaching,
    sources: &'a mut SourcesManager,
    tables: &'a mut CollectedTables,
    missing_includes: &'a mut Vec<FilePathId>,
    file_ids: HashMap<FileUid, FilePathId>,
    /// Files entered in this run, sorted.
    already_included: Vec<FileUid>,
    /// Files whose facts are collected in this run.
    collected: HashSet<FileUid>,
    system_files: HashSet<FileUid>,
    maybe_used_macros: Vec<(String, FilePathId)>,
}

impl<'a> TranslationUnitCollector<'a> {
    pub(crate) fn new(
        paths: &'a dyn FilePathCaching,
        sources: &'a mut SourcesManager,
        tables: &'a mut CollectedTables,
        missing_includes: &'a mut Vec<FilePathId>,
    ) -> Self {
        Self {
            paths,
            sources,
            tables,
            missing_includes,
            file_ids: HashMap::new(),
            already_included: Vec::new(),
            collected: HashSet::new(),
            system_files: HashSet::new(),
            maybe_used_macros: Vec::new(),
        }
    }

    fn file_id(&mut self, file: &SourceFile) -> FilePathId {
        let paths = self.paths;
        *self
            .file_ids
            .entry(file.uid)
            .or_insert_with(|| paths.file_path_id(&file.path))
    }

    /// The persistent id of a location's file, when its facts are collected
    /// in this run.
    fn collected_id(&self, location: &Location) -> Option<FilePathId> {
        if !self.collected.contains(&location.file) || self.system_files.contains(&location.file) {
            return None;
        }
        self.file_ids.get(&location.file).copied()
    }

    fn add_macro_location(
        &mut self,
        definition: &MacroDefinition,
        location: &Location,
        kind: SourceLocationKind,
    ) {
        let Some(file_path_id) = self.collected_id(location) else {
            return;
        };
        let symbol_id = self.tables.intern_symbol(SymbolEntry::new(
            definition.usr.clone(),
            definition.name.clone(),
            SymbolKind::Macro,
        ));
        self.tables.push_location(SourceLocationEntry {
            symbol_id,
            file_path_id,
            line: location.line,
            column: location.column,
            kind,
        });
    }

    /// `#ifdef`, `#ifndef` and `defined()` of an undefined name may be a
    /// header guard; decided at the end of the main file.
    fn add_used_macro(&mut self, token: &MacroNameToken<'_>) {
        let Some(file_path_id) = self.collected_id(&token.location) else {
            return;
        };
        match token.definition {
            Some(definition) => {
                self.tables
                    .used_macros
                    .push(UsedMacro::new(token.name, file_path_id));
                self.add_macro_location(definition, &token.location, SourceLocationKind::MacroUsage);
            }
            None => self
                .maybe_used_macros
                .push((token.name.to_string(), file_path_id)),
        }
    }
}

impl FrontEndCallbacks for TranslationUnitCollector<'_> {
    fn file_entered(&mut self, file: &SourceFile, source_type: SourceType) {
        let file_path_id = self.file_id(file);
        if file.is_system {
            self.system_files.insert(file.uid);
        }
        match self.already_included.binary_search(&file.uid) {
            Ok(_) => return,
            Err(index) => self.already_included.insert(index, file.uid),
        }

        self.tables.source_entries.push(SourceEntry {
            file_path_id,
            source_type,
            last_modified: file.last_modified,
            has_missing_includes: HasMissingIncludes::No,
        });

        let collect = match source_type {
            SourceType::Source => true,
            _ => !self
                .sources
                .already_parsed_all_dependent_files(file_path_id, file.last_modified),
        };
        if !collect {
            if self.sources.has_missing_includes(file_path_id) {
                self.missing_includes.push(file_path_id);
            }
            return;
        }

        self.collected.insert(file.uid);
        self.tables.file_statuses.push(FileStatus {
            file_path_id,
            size: file.size,
            last_modified: file.last_modified,
        });
    }

    fn inclusion_directive(&mut self, directive: &InclusionDirective<'_>) {
        if !self.collected.contains(&directive.includer.uid) {
            return;
        }
        let includer = self.file_id(directive.includer);
        match directive.file {
            Some(file) => {
                let dependency = self.file_id(file);
                self.tables
                    .source_dependencies
                    .push(SourceDependency::new(includer, dependency));
            }
            None => self.missing_includes.push(includer),
        }
    }

    fn macro_defined(&mut self, definition: &MacroDefinition) {
        if let Some(location) = definition.location {
            self.add_macro_location(definition, &location, SourceLocationKind::MacroDefinition);
        }
    }

    fn macro_undefined(&mut self, token: &MacroNameToken<'_>) {
        if let Some(definition) = token.definition {
            self.add_macro_location(definition, &token.location, SourceLocationKind::MacroUndefinition);
        }
    }

    fn macro_expands(&mut self, token: &MacroNameToken<'_>) {
        let Some(file_path_id) = self.collected_id(&token.location) else {
            return;
        };
        self.tables
            .used_macros
            .push(UsedMacro::new(token.name, file_path_id));
        if let Some(definition) = token.definition {
            self.add_macro_location(definition, &token.location, SourceLocationKind::MacroUsage);
        }
    }

    fn ifdef(&mut self, token: &MacroNameToken<'_>) {
        self.add_used_macro(token);
    }

    fn ifndef(&mut self, token: &MacroNameToken<'_>) {
        self.add_used_macro(token);
    }

    fn defined(&mut self, token: &MacroNameToken<'_>) {
        self.add_used_macro(token);
    }

    fn occurrence(&mut self, occurrence: &DeclOccurrence<'_>) {
        let Some(file_path_id) = self.collected_id(&occurrence.location) else {
            return;
        };
        let symbol_id = self.tables.intern_symbol(
            SymbolEntry::new(occurrence.usr, occurrence.name, occurrence.kind)
                .with_tags(occurrence.tags),
        );
        let kind = match occurrence.role {
            OccurrenceRole::Declaration => SourceLocationKind::Declaration,
            OccurrenceRole::Definition => SourceLocationKind::Definition,
            OccurrenceRole::Reference => SourceLocationKind::DeclarationReference,
        };
        self.tables.push_location(SourceLocationEntry {
            symbol_id,
            file_path_id,
            line: occurrence.location.line,
            column: occurrence.location.column,
            kind,
        });
    }

    fn end_of_main_file(&mut self, macros: &MacroTable) {
        for (name, file_path_id) in std::mem::take(&mut self.maybe_used_macros) {
            if !macros.is_header_guard(&name) {
                self.tables
                    .used_macros
                    .push(UsedMacro::new(name, file_path_id));
            }
        }
    }
}
