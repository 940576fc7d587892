use std::collections::HashMap;
use std::sync::Arc;

use ri_core::{normalize_path, FileContainer, Language, SourceType};
use tree_sitter::Parser;

use crate::arguments::CompilerInvocation;
use crate::callbacks::{FileUid, FrontEndCallbacks};
use crate::error::ParserError;
use crate::preprocessor::Walker;
use crate::registry::ParserRegistry;
use crate::source_manager::{Overlays, SourceManager};

/// A problem found while processing a translation unit that did not stop it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontEndDiagnostic {
    pub file: String,
    /// 1-based; 0 when the problem is not tied to a line.
    pub line: u32,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct TranslationUnitSummary {
    pub main_file: FileUid,
    pub language: Language,
    pub files_entered: usize,
    pub declarations: usize,
    pub diagnostics: Vec<FrontEndDiagnostic>,
}

/// A C/C++ front end: runs one translation unit at a time and reports what
/// it sees through [`FrontEndCallbacks`].
pub trait FrontEnd: Send {
    /// Replace the set of in-memory files shadowing the file system.
    fn set_unsaved_files(&mut self, files: &[FileContainer]);

    fn run(
        &mut self,
        main_file: &str,
        arguments: &[String],
        callbacks: &mut dyn FrontEndCallbacks,
    ) -> Result<TranslationUnitSummary, ParserError>;
}

/// [`FrontEnd`] over tree-sitter grammars with a lightweight preprocessor.
pub struct TreeSitterFrontEnd {
    parser: Parser,
    overlays: Overlays,
}

impl TreeSitterFrontEnd {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
            overlays: Arc::default(),
        }
    }
}

impl Default for TreeSitterFrontEnd {
    fn default() -> Self {
        Self::new()
    }
}

fn builtin_macros(language: Language) -> &'static [(&'static str, &'static str)] {
    match language {
        Language::C => &[("__STDC__", "1"), ("__STDC_VERSION__", "201710L")],
        Language::Cxx => &[("__STDC__", "1"), ("__cplusplus", "201703L")],
    }
}

impl FrontEnd for TreeSitterFrontEnd {
    fn set_unsaved_files(&mut self, files: &[FileContainer]) {
        let overlays: HashMap<String, Arc<str>> = files
            .iter()
            .map(|file| (normalize_path(&file.file_path), Arc::from(file.content.as_str())))
            .collect();
        self.overlays = Arc::new(overlays);
    }

    #[tracing::instrument(skip_all, fields(file = %main_file))]
    fn run(
        &mut self,
        main_file: &str,
        arguments: &[String],
        callbacks: &mut dyn FrontEndCallbacks,
    ) -> Result<TranslationUnitSummary, ParserError> {
        let invocation = CompilerInvocation::parse(arguments, None)?;
        let language = invocation.language_for(main_file);
        self.parser
            .set_language(&ParserRegistry::grammar(language))
            .map_err(|e| ParserError::ParseFailed {
                path: main_file.to_string(),
                reason: e.to_string(),
            })?;

        let mut sources = SourceManager::new(self.overlays.clone());
        let main = sources.load(main_file, false)?;
        sources.parse(main, &mut self.parser)?;

        let mut walker = Walker::new(&invocation, sources, &mut self.parser, callbacks);
        walker.predefine(builtin_macros(language));
        if let Some(pch) = &invocation.precompiled_header {
            walker.replay_silently(pch);
        }
        walker.enter_file(main, SourceType::Source, &invocation.forced_includes);
        walker.callbacks.end_of_main_file(&walker.macros);

        tracing::debug!(
            files = walker.files_entered,
            declarations = walker.symbols.len(),
            diagnostics = walker.diagnostics.len(),
            "translation unit processed"
        );

        Ok(TranslationUnitSummary {
            main_file: main,
            language,
            files_entered: walker.files_entered,
            declarations: walker.symbols.len(),
            diagnostics: walker.diagnostics,
        })
    }
}
