use std::collections::HashMap;

use ri_core::{normalize_path, FileContainer, SourceLocation, SourceLocationsContainer, SourceType};
use ri_parser::{
    DeclOccurrence, FileUid, FrontEnd, FrontEndCallbacks, Location, MacroDefinition, MacroNameToken,
    SourceFile, TreeSitterFrontEnd,
};

use crate::error::QueryError;
use crate::messages::SourceLocationsForRenamingMessage;

/// One spelling of a symbol seen during a run.
#[derive(Debug, Clone)]
struct Spelling {
    usr: String,
    name: String,
    location: Location,
}

/// Records every named occurrence of a translation unit, keyed by USR.
#[derive(Default)]
struct OccurrenceRecorder {
    files: HashMap<FileUid, String>,
    spellings: Vec<Spelling>,
}

impl OccurrenceRecorder {
    fn record_macro(&mut self, token: &MacroNameToken<'_>) {
        if let Some(definition) = token.definition {
            self.spellings.push(Spelling {
                usr: definition.usr.clone(),
                name: token.name.to_string(),
                location: token.location,
            });
        }
    }

    /// The spelling whose token covers `line`:`column` in `file`.
    fn at_cursor(&self, file: FileUid, line: u32, column: u32) -> Option<&Spelling> {
        self.spellings.iter().find(|spelling| {
            let location = spelling.location;
            location.file == file
                && location.line == line
                && location.column <= column
                && column < location.column + spelling.name.len() as u32
        })
    }
}

impl FrontEndCallbacks for OccurrenceRecorder {
    fn file_entered(&mut self, file: &SourceFile, _source_type: SourceType) {
        self.files.insert(file.uid, file.path.clone());
    }

    fn file_skipped(&mut self, file: &SourceFile) {
        self.files.insert(file.uid, file.path.clone());
    }

    fn macro_defined(&mut self, definition: &MacroDefinition) {
        if let Some(location) = definition.location {
            self.spellings.push(Spelling {
                usr: definition.usr.clone(),
                name: definition.name.clone(),
                location,
            });
        }
    }

    fn macro_undefined(&mut self, token: &MacroNameToken<'_>) {
        self.record_macro(token);
    }

    fn macro_expands(&mut self, token: &MacroNameToken<'_>) {
        self.record_macro(token);
    }

    fn ifdef(&mut self, token: &MacroNameToken<'_>) {
        self.record_macro(token);
    }

    fn ifndef(&mut self, token: &MacroNameToken<'_>) {
        self.record_macro(token);
    }

    fn defined(&mut self, token: &MacroNameToken<'_>) {
        self.record_macro(token);
    }

    fn occurrence(&mut self, occurrence: &DeclOccurrence<'_>) {
        self.spellings.push(Spelling {
            usr: occurrence.usr.to_string(),
            name: occurrence.name.to_string(),
            location: occurrence.location,
        });
    }
}

/// Finds the symbol under a cursor and every place it is spelled in the
/// translation unit, for renaming.
pub struct SymbolFinder {
    front_end: Box<dyn FrontEnd>,
    unsaved: Vec<FileContainer>,
}

impl SymbolFinder {
    pub fn new() -> Self {
        Self::with_front_end(Box::new(TreeSitterFrontEnd::new()))
    }

    pub fn with_front_end(front_end: Box<dyn FrontEnd>) -> Self {
        Self {
            front_end,
            unsaved: Vec::new(),
        }
    }

    pub fn set_unsaved_files(&mut self, files: Vec<FileContainer>) {
        self.unsaved = files;
    }

    /// Locate the symbol at 1-based `line`:`column` of `file` and collect
    /// its declarations, definitions, references and macro uses.
    #[tracing::instrument(skip_all, fields(file = %file.file_path, line, column))]
    pub fn find(
        &mut self,
        file: &FileContainer,
        line: u32,
        column: u32,
    ) -> Result<SourceLocationsForRenamingMessage, QueryError> {
        let main_path = normalize_path(&file.file_path);
        let mut overlays: Vec<FileContainer> = self
            .unsaved
            .iter()
            .filter(|unsaved| normalize_path(&unsaved.file_path) != main_path)
            .cloned()
            .collect();
        overlays.push(file.clone());
        self.front_end.set_unsaved_files(&overlays);

        let mut recorder = OccurrenceRecorder::default();
        let summary = self.front_end.run(&main_path, &file.arguments, &mut recorder)?;

        let Some(target) = recorder.at_cursor(summary.main_file, line, column) else {
            return Err(QueryError::NoSymbolAtCursor {
                path: main_path,
                line,
                column,
            });
        };

        let mut source_locations = SourceLocationsContainer::default();
        for spelling in recorder.spellings.iter().filter(|s| s.usr == target.usr) {
            if let Some(path) = recorder.files.get(&spelling.location.file) {
                let location = spelling.location;
                source_locations.push(
                    path,
                    SourceLocation::new(location.line, location.column, location.offset),
                );
            }
        }
        source_locations.finish();

        tracing::debug!(
            symbol = %target.name,
            locations = source_locations.locations.len(),
            "symbol found"
        );
        Ok(SourceLocationsForRenamingMessage {
            symbol_name: target.name.clone(),
            source_locations,
            text_document_revision: file.document_revision,
        })
    }
}

impl Default for SymbolFinder {
    fn default() -> Self {
        Self::new()
    }
}
