use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::{FilePathId, ProjectPartId};
use crate::language::Language;

/// A `-D` style macro definition. Sorted by key, then value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CompilerMacro {
    pub key: String,
    pub value: String,
}

impl CompilerMacro {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Render as a front-end argument (`-DKEY=VALUE`, or `-DKEY` when empty).
    pub fn to_argument(&self) -> String {
        if self.value.is_empty() {
            format!("-D{}", self.key)
        } else {
            format!("-D{}={}", self.key, self.value)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncludeSearchPathType {
    User,
    System,
    BuiltIn,
    Framework,
}

/// One include directory with its position in the search order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IncludeSearchPath {
    pub path: String,
    pub index: u32,
    #[serde(rename = "type")]
    pub path_type: IncludeSearchPathType,
}

impl IncludeSearchPath {
    pub fn new(path: impl Into<String>, index: u32, path_type: IncludeSearchPathType) -> Self {
        Self {
            path: path.into(),
            index,
            path_type,
        }
    }

    pub fn is_system(&self) -> bool {
        !matches!(self.path_type, IncludeSearchPathType::User)
    }
}

/// An incoming project-part descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPartContainer {
    pub project_part_id: ProjectPartId,
    /// Tool-chain arguments that are not macros or include paths.
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub compiler_macros: Vec<CompilerMacro>,
    #[serde(default)]
    pub include_search_paths: Vec<IncludeSearchPath>,
    #[serde(default)]
    pub header_path_ids: Vec<FilePathId>,
    pub source_path_ids: Vec<FilePathId>,
    #[serde(default = "default_language")]
    pub language: Language,
}

fn default_language() -> Language {
    Language::Cxx
}

impl ProjectPartContainer {
    pub fn new(project_part_id: ProjectPartId, source_path_ids: Vec<FilePathId>) -> Self {
        Self {
            project_part_id,
            arguments: Vec::new(),
            compiler_macros: Vec::new(),
            include_search_paths: Vec::new(),
            header_path_ids: Vec::new(),
            source_path_ids,
            language: Language::Cxx,
        }
    }

    /// Sort macros and include paths so comparisons are order independent.
    pub fn normalize(&mut self) {
        self.compiler_macros.sort();
        self.compiler_macros.dedup();
        self.include_search_paths.sort_by_key(|p| p.index);
        self.source_path_ids.sort();
        self.source_path_ids.dedup();
        self.header_path_ids.sort();
        self.header_path_ids.dedup();
    }
}

/// Stored configuration of a project part, as of its last indexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPartArtefact {
    pub project_part_id: ProjectPartId,
    pub compiler_arguments: Vec<String>,
    pub compiler_macros: Vec<CompilerMacro>,
    pub include_search_paths: Vec<IncludeSearchPath>,
    pub language: Language,
}

impl ProjectPartArtefact {
    /// Decode the JSON columns of a stored project-part row.
    pub fn from_json(
        project_part_id: ProjectPartId,
        compiler_arguments: &str,
        compiler_macros: &str,
        include_search_paths: &str,
        language: Language,
    ) -> Result<Self, CoreError> {
        let compiler_arguments: Vec<String> = serde_json::from_str(compiler_arguments)
            .map_err(|e| CoreError::ArtefactParse {
                category: "compiler arguments",
                message: e.to_string(),
            })?;
        let macro_map: BTreeMap<String, String> =
            serde_json::from_str(compiler_macros).map_err(|e| CoreError::ArtefactParse {
                category: "compiler macros",
                message: e.to_string(),
            })?;
        let mut include_search_paths: Vec<IncludeSearchPath> =
            serde_json::from_str(include_search_paths).map_err(|e| CoreError::ArtefactParse {
                category: "include search paths",
                message: e.to_string(),
            })?;
        include_search_paths.sort_by_key(|p| p.index);

        Ok(Self {
            project_part_id,
            compiler_arguments,
            compiler_macros: macro_map
                .into_iter()
                .map(|(key, value)| CompilerMacro { key, value })
                .collect(),
            include_search_paths,
            language,
        })
    }

    pub fn arguments_to_json(arguments: &[String]) -> String {
        serde_json::to_string(arguments).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn macros_to_json(macros: &[CompilerMacro]) -> String {
        let map: BTreeMap<&str, &str> = macros
            .iter()
            .map(|m| (m.key.as_str(), m.value.as_str()))
            .collect();
        serde_json::to_string(&map).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn include_search_paths_to_json(paths: &[IncludeSearchPath]) -> String {
        serde_json::to_string(paths).unwrap_or_else(|_| "[]".to_string())
    }

    /// Whether macros or include search paths differ from `part`, which
    /// invalidates every file of the part.
    pub fn configuration_differs(&self, part: &ProjectPartContainer) -> bool {
        let as_map = |macros: &[CompilerMacro]| -> BTreeMap<String, String> {
            macros
                .iter()
                .map(|m| (m.key.clone(), m.value.clone()))
                .collect()
        };
        let mut incoming_paths = part.include_search_paths.clone();
        incoming_paths.sort_by_key(|p| p.index);

        as_map(&self.compiler_macros) != as_map(&part.compiler_macros)
            || self.include_search_paths != incoming_paths
            || self.compiler_arguments != part.arguments
            || self.language != part.language
    }

    /// Rebuild a descriptor from the stored configuration.
    pub fn to_container(&self, source_path_ids: Vec<FilePathId>) -> ProjectPartContainer {
        ProjectPartContainer {
            project_part_id: self.project_part_id,
            arguments: self.compiler_arguments.clone(),
            compiler_macros: self.compiler_macros.clone(),
            include_search_paths: self.include_search_paths.clone(),
            header_path_ids: Vec::new(),
            source_path_ids,
            language: self.language,
        }
    }
}

/// A precompiled header registered for a project part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPartPch {
    pub project_part_id: ProjectPartId,
    pub pch_path: String,
    pub last_modified: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artefact() -> ProjectPartArtefact {
        ProjectPartArtefact::from_json(
            ProjectPartId(1),
            r#"["-std=c++17"]"#,
            r#"{"DEBUG":"1","FOO":""}"#,
            r#"[{"path":"/usr/include","index":1,"type":"system"},{"path":"/src","index":0,"type":"user"}]"#,
            Language::Cxx,
        )
        .unwrap()
    }

    fn container() -> ProjectPartContainer {
        let mut part = ProjectPartContainer::new(ProjectPartId(1), vec![FilePathId(1)]);
        part.arguments = vec!["-std=c++17".to_string()];
        part.compiler_macros = vec![CompilerMacro::new("FOO", ""), CompilerMacro::new("DEBUG", "1")];
        part.include_search_paths = vec![
            IncludeSearchPath::new("/usr/include", 1, IncludeSearchPathType::System),
            IncludeSearchPath::new("/src", 0, IncludeSearchPathType::User),
        ];
        part
    }

    #[test]
    fn artefact_decodes_sorted() {
        let a = artefact();
        assert_eq!(a.compiler_arguments, vec!["-std=c++17"]);
        assert_eq!(a.compiler_macros[0].key, "DEBUG");
        assert_eq!(a.include_search_paths[0].path, "/src");
    }

    #[test]
    fn same_configuration_does_not_differ() {
        assert!(!artefact().configuration_differs(&container()));
    }

    #[test]
    fn changed_macro_differs() {
        let mut part = container();
        part.compiler_macros[1].value = "0".to_string();
        assert!(artefact().configuration_differs(&part));
    }

    #[test]
    fn changed_include_path_differs() {
        let mut part = container();
        part.include_search_paths.pop();
        assert!(artefact().configuration_differs(&part));
    }

    #[test]
    fn malformed_macros_report_category() {
        let err = ProjectPartArtefact::from_json(
            ProjectPartId(1),
            "[]",
            "{not json",
            "[]",
            Language::Cxx,
        )
        .unwrap_err();
        match err {
            CoreError::ArtefactParse { category, .. } => assert_eq!(category, "compiler macros"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn json_round_trip_through_storage_columns() {
        let part = container();
        let a = ProjectPartArtefact::from_json(
            part.project_part_id,
            &ProjectPartArtefact::arguments_to_json(&part.arguments),
            &ProjectPartArtefact::macros_to_json(&part.compiler_macros),
            &ProjectPartArtefact::include_search_paths_to_json(&part.include_search_paths),
            part.language,
        )
        .unwrap();
        assert!(!a.configuration_differs(&part));
    }

    #[test]
    fn macro_argument_rendering() {
        assert_eq!(CompilerMacro::new("A", "").to_argument(), "-DA");
        assert_eq!(CompilerMacro::new("A", "2").to_argument(), "-DA=2");
    }
}
