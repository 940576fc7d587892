//! JSON-lines protocol: one request object per input line, one response
//! object per output line. Both are tagged by a `"type"` field.

use std::io::{BufRead, Write};

use ri_core::{
    normalize_path, CompilerMacro, FileContainer, FilePathCaching, IncludeSearchPath, Language,
    ProjectPartContainer, ProjectPartId, ProjectPartPch,
};
use ri_query::{
    SourceLocationsForRenamingMessage, SourceRangesAndDiagnosticsForQueryMessage,
    SourceRangesForQueryMessage,
};
use serde::{Deserialize, Serialize};

use crate::error::ServerError;

/// A project part as clients describe it: by paths, not ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectPartMessage {
    pub project_part_id: ProjectPartId,
    pub sources: Vec<String>,
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub compiler_macros: Vec<CompilerMacro>,
    #[serde(default)]
    pub include_search_paths: Vec<IncludeSearchPath>,
    #[serde(default)]
    pub language: Option<Language>,
}

impl ProjectPartMessage {
    /// Intern the paths and build the indexer's descriptor.
    pub fn into_container(self, paths: &dyn FilePathCaching) -> ProjectPartContainer {
        let intern = |path: &String| paths.file_path_id(&normalize_path(path));
        let mut part = ProjectPartContainer::new(
            self.project_part_id,
            self.sources.iter().map(intern).collect(),
        );
        part.header_path_ids = self.headers.iter().map(intern).collect();
        part.arguments = self.arguments;
        part.compiler_macros = self.compiler_macros;
        part.include_search_paths = self.include_search_paths;
        if let Some(language) = self.language {
            part.language = language;
        }
        part
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    UpdateProjectParts {
        project_parts: Vec<ProjectPartMessage>,
    },
    RemoveProjectParts {
        project_part_ids: Vec<ProjectPartId>,
    },
    UpdateGeneratedFiles {
        files: Vec<FileContainer>,
    },
    RemoveGeneratedFiles {
        file_paths: Vec<String>,
    },
    UpdatePrecompiledHeader {
        pch: ProjectPartPch,
    },
    RemovePrecompiledHeader {
        project_part_id: ProjectPartId,
    },
    PathsChanged {
        file_paths: Vec<String>,
    },
    RequestSourceRangesAndDiagnosticsForQuery {
        query: String,
        source: FileContainer,
    },
    RequestSourceRangesForQuery {
        query: String,
        sources: Vec<FileContainer>,
        #[serde(default)]
        unsaved_files: Vec<FileContainer>,
    },
    RequestSourceLocationsForRenaming {
        file: FileContainer,
        line: u32,
        column: u32,
    },
    CancelQuery,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    SourceRangesAndDiagnosticsForQuery(SourceRangesAndDiagnosticsForQueryMessage),
    SourceRangesForQuery(SourceRangesForQueryMessage),
    SourceLocationsForRenaming(SourceLocationsForRenamingMessage),
    Progress { progress: usize, total: usize },
    Error { message: String },
}

/// Parse one input line. Blank lines yield `None`.
pub fn read_request(line: &str) -> Result<Option<Request>, ServerError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line)?))
}

pub fn write_response(writer: &mut impl Write, response: &Response) -> Result<(), ServerError> {
    serde_json::to_writer(&mut *writer, response)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Read every request of `reader`, skipping blank lines.
pub fn read_requests(reader: impl BufRead) -> impl Iterator<Item = Result<Request, ServerError>> {
    reader.lines().filter_map(|line| match line {
        Ok(line) => read_request(&line).transpose(),
        Err(e) => Some(Err(e.into())),
    })
}
