use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use ri_core::normalize_path;
use tree_sitter::{Node, Parser, Tree};

use crate::arguments::CompilerInvocation;
use crate::callbacks::{FileUid, SourceFile};
use crate::error::ParserError;
use crate::file_check::{check_file_size, is_binary};

/// Unsaved buffers keyed by normalized path.
pub(crate) type Overlays = Arc<HashMap<String, Arc<str>>>;

/// The `#ifndef X / #define X ... #endif` wrapping a header.
#[derive(Debug, Clone)]
pub(crate) struct HeaderGuard {
    pub name: String,
    /// Node id of the guarding `#define`.
    pub define_node: usize,
}

pub(crate) struct LoadedFile {
    pub info: SourceFile,
    pub content: Arc<str>,
    pub tree: Option<Tree>,
    pub guard: Option<HeaderGuard>,
    pub pragma_once: bool,
    pub times_entered: u32,
}

/// Files of one translation unit: loading, overlay lookup, include search
/// and lazily parsed trees.
pub(crate) struct SourceManager {
    overlays: Overlays,
    files: Vec<LoadedFile>,
    by_path: HashMap<String, FileUid>,
}

impl SourceManager {
    pub fn new(overlays: Overlays) -> Self {
        Self {
            overlays,
            files: Vec::new(),
            by_path: HashMap::new(),
        }
    }

    /// Load `path` (overlay first, then disk). Loading the same path twice
    /// returns the same uid.
    pub fn load(&mut self, path: &str, is_system: bool) -> Result<FileUid, ParserError> {
        let path = normalize_path(path);
        if let Some(&uid) = self.by_path.get(&path) {
            return Ok(uid);
        }

        let disk_modified = modification_time(&path);
        let (content, last_modified): (Arc<str>, i64) = match self.overlays.get(&path) {
            Some(content) => (content.clone(), disk_modified.unwrap_or(0)),
            None => {
                let metadata = std::fs::metadata(&path).map_err(|_| ParserError::FileNotFound {
                    path: path.clone(),
                })?;
                check_file_size(&path, metadata.len())?;
                let bytes = std::fs::read(&path).map_err(|source| ParserError::Io {
                    path: path.clone(),
                    source,
                })?;
                if is_binary(&bytes) {
                    return Err(ParserError::InvalidEncoding { path });
                }
                let text = String::from_utf8(bytes)
                    .map_err(|_| ParserError::InvalidEncoding { path: path.clone() })?;
                (Arc::from(text), disk_modified.unwrap_or(0))
            }
        };

        let uid = FileUid(self.files.len() as u32);
        self.files.push(LoadedFile {
            info: SourceFile {
                uid,
                path: path.clone(),
                size: content.len() as u64,
                last_modified,
                is_system,
            },
            content,
            tree: None,
            guard: None,
            pragma_once: false,
            times_entered: 0,
        });
        self.by_path.insert(path, uid);
        Ok(uid)
    }

    pub fn info(&self, uid: FileUid) -> &SourceFile {
        &self.files[uid.0 as usize].info
    }

    pub fn file(&self, uid: FileUid) -> &LoadedFile {
        &self.files[uid.0 as usize]
    }

    pub fn file_mut(&mut self, uid: FileUid) -> &mut LoadedFile {
        &mut self.files[uid.0 as usize]
    }

    /// The syntax tree and text of `uid`, parsed on first request.
    pub fn parse(&mut self, uid: FileUid, parser: &mut Parser) -> Result<(Tree, Arc<str>), ParserError> {
        let file = &mut self.files[uid.0 as usize];
        if let Some(tree) = &file.tree {
            return Ok((tree.clone(), file.content.clone()));
        }
        let tree = parser
            .parse(file.content.as_bytes(), None)
            .ok_or_else(|| ParserError::ParseFailed {
                path: file.info.path.clone(),
                reason: "tree-sitter returned no tree".to_string(),
            })?;
        file.guard = detect_header_guard(tree.root_node(), &file.content);
        file.tree = Some(tree.clone());
        Ok((tree, file.content.clone()))
    }

    fn exists(&self, path: &str) -> bool {
        self.overlays.contains_key(path) || Path::new(path).is_file()
    }

    /// Search for an include. Quoted includes look next to the includer,
    /// then in `-iquote`, `-I` and system directories; angled includes skip
    /// the first two. Returns the normalized path and whether it was found
    /// in a system directory.
    pub fn resolve_include(
        &self,
        spelled: &str,
        is_angled: bool,
        includer: FileUid,
        invocation: &CompilerInvocation,
    ) -> Option<(String, bool)> {
        if spelled.starts_with('/') {
            let path = normalize_path(spelled);
            return self.exists(&path).then_some((path, false));
        }

        let includer_path = &self.info(includer).path;
        let includer_dir = Path::new(includer_path)
            .parent()
            .and_then(|p| p.to_str())
            .unwrap_or("");

        let mut candidates: Vec<(&str, bool)> = Vec::new();
        if !is_angled {
            candidates.push((includer_dir, self.info(includer).is_system));
            candidates.extend(invocation.quote_include_paths.iter().map(|d| (d.as_str(), false)));
        }
        candidates.extend(invocation.user_include_paths.iter().map(|d| (d.as_str(), false)));
        candidates.extend(invocation.system_include_paths.iter().map(|d| (d.as_str(), true)));

        candidates.into_iter().find_map(|(dir, is_system)| {
            let path = normalize_path(&format!("{dir}/{spelled}"));
            self.exists(&path).then_some((path, is_system))
        })
    }
}

fn modification_time(path: &str) -> Option<i64> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    modified
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs() as i64)
}

/// Recognize a header whose only top-level content is
/// `#ifndef G` / `#define G` / ... / `#endif` (comments aside).
pub(crate) fn detect_header_guard(root: Node<'_>, content: &str) -> Option<HeaderGuard> {
    let mut cursor = root.walk();
    let mut top_level = root
        .named_children(&mut cursor)
        .filter(|child| child.kind() != "comment");
    let conditional = top_level.next()?;
    if top_level.next().is_some() || conditional.kind() != "preproc_ifdef" {
        return None;
    }
    if conditional.child(0)?.kind() != "#ifndef" || conditional.child_by_field_name("alternative").is_some() {
        return None;
    }

    let name_node = conditional.child_by_field_name("name")?;
    let name = name_node.utf8_text(content.as_bytes()).ok()?;

    let mut cursor = conditional.walk();
    let define = conditional
        .named_children(&mut cursor)
        .find(|child| child.id() != name_node.id() && child.kind() != "comment")?;
    if define.kind() != "preproc_def" {
        return None;
    }
    let defined = define
        .child_by_field_name("name")?
        .utf8_text(content.as_bytes())
        .ok()?;
    (defined == name).then(|| HeaderGuard {
        name: name.to_string(),
        define_node: define.id(),
    })
}
