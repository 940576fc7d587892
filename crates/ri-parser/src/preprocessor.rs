use std::collections::HashSet;
use std::sync::Arc;

use ri_core::SourceType;
use tree_sitter::{Node, Parser};

use crate::arguments::{CompilerInvocation, MacroCommand};
use crate::callbacks::{FileUid, FrontEndCallbacks, InclusionDirective, Location, MacroNameToken};
use crate::condition::{self, ConditionContext};
use crate::driver::FrontEndDiagnostic;
use crate::error::ParserError;
use crate::macros::{MacroTable, PendingDefinition};
use crate::source_manager::SourceManager;
use crate::symbol_table::SymbolTable;
use crate::usr::ScopeKind;

/// Nesting limit for `#include`, matching common compiler defaults.
pub(crate) const MAX_INCLUDE_DEPTH: usize = 200;

pub(crate) struct FileFrame {
    pub uid: FileUid,
    pub content: Arc<str>,
    pub guard_define: Option<usize>,
    pub is_system: bool,
}

#[derive(Debug, Clone)]
pub(crate) enum Frame {
    /// Namespace, record or enum: contributes to USRs and name lookup.
    Scope { kind: ScopeKind, name: String },
    /// Function body: declarations inside are locals.
    Function,
    /// Anonymous record: members are not indexed.
    Anonymous,
}

#[derive(Clone, Copy)]
enum MacroEvent {
    Expands,
    Ifdef,
    Ifndef,
    Defined,
}

/// Walks one translation unit: directives in source order, includes entered
/// in place, code handed to the declaration visitor.
pub(crate) struct Walker<'a> {
    pub invocation: &'a CompilerInvocation,
    pub sources: SourceManager,
    pub parser: &'a mut Parser,
    pub callbacks: &'a mut dyn FrontEndCallbacks,
    pub macros: MacroTable,
    pub symbols: SymbolTable,
    pub files: Vec<FileFrame>,
    pub frames: Vec<Frame>,
    pub locals: Vec<HashSet<String>>,
    pub declared_names: HashSet<(FileUid, usize)>,
    /// Replaying a precompiled header: state changes, no events.
    pub silent: bool,
    pub diagnostics: Vec<FrontEndDiagnostic>,
    pub files_entered: usize,
}

impl<'a> Walker<'a> {
    pub fn new(
        invocation: &'a CompilerInvocation,
        sources: SourceManager,
        parser: &'a mut Parser,
        callbacks: &'a mut dyn FrontEndCallbacks,
    ) -> Self {
        Self {
            invocation,
            sources,
            parser,
            callbacks,
            macros: MacroTable::default(),
            symbols: SymbolTable::default(),
            files: Vec::new(),
            frames: Vec::new(),
            locals: Vec::new(),
            declared_names: HashSet::new(),
            silent: false,
            diagnostics: Vec::new(),
            files_entered: 0,
        }
    }

    /// Built-in and command-line macros, in command-line order.
    pub fn predefine(&mut self, builtins: &[(&str, &str)]) {
        for (name, value) in builtins {
            self.define_without_location(name, value);
        }
        let commands = self.invocation.macro_commands.clone();
        for command in commands {
            match command {
                MacroCommand::Define { name, value } => self.define_without_location(&name, &value),
                MacroCommand::Undefine(name) => {
                    self.macros.undefine(&name);
                }
            }
        }
    }

    fn define_without_location(&mut self, name: &str, value: &str) {
        let definition = self.macros.define(PendingDefinition {
            name,
            parameters: None,
            body: value.to_string(),
            location: None,
            file_path: None,
            used_for_header_guard: false,
        });
        if !self.silent {
            self.callbacks.macro_defined(definition);
        }
    }

    /// Process a prefix header without emitting events, leaving its macros
    /// and declarations in effect.
    pub fn replay_silently(&mut self, path: &str) {
        match self.sources.load(path, false) {
            Ok(uid) => {
                self.silent = true;
                self.enter_file(uid, SourceType::UserInclude, &[]);
                self.silent = false;
            }
            Err(error) => {
                tracing::warn!(path, error = %error, "precompiled header not loaded");
                self.diagnostics.push(FrontEndDiagnostic {
                    file: path.to_string(),
                    line: 0,
                    message: error.to_string(),
                });
            }
        }
    }

    /// Enter a file and walk it. `forced_includes` are processed at its top,
    /// as `-include` does for the main file.
    pub fn enter_file(&mut self, uid: FileUid, source_type: SourceType, forced_includes: &[String]) {
        let (tree, content) = match self.sources.parse(uid, &mut *self.parser) {
            Ok(parsed) => parsed,
            Err(error) => {
                let path = self.sources.info(uid).path.clone();
                self.diagnostics.push(FrontEndDiagnostic {
                    file: path,
                    line: 0,
                    message: error.to_string(),
                });
                return;
            }
        };

        let file = self.sources.file_mut(uid);
        file.times_entered += 1;
        let guard_define = file.guard.as_ref().map(|guard| guard.define_node);
        let is_system = file.info.is_system;
        self.files_entered += 1;

        let _span = tracing::debug_span!("file", path = %self.sources.info(uid).path).entered();
        if tree.root_node().has_error() {
            tracing::debug!("syntax errors, continuing with recovered tree");
        }

        if !self.silent {
            self.callbacks.file_entered(self.sources.info(uid), source_type);
        }
        self.files.push(FileFrame {
            uid,
            content,
            guard_define,
            is_system,
        });

        for path in forced_includes {
            let location = Location {
                file: uid,
                line: 1,
                column: 1,
                offset: 0,
            };
            self.include(path, false, location);
        }

        self.walk_children(tree.root_node());
        self.files.pop();
    }

    pub fn current_uid(&self) -> FileUid {
        self.files.last().map_or(FileUid(0), |frame| frame.uid)
    }

    pub fn in_system_file(&self) -> bool {
        self.files.last().is_some_and(|frame| frame.is_system)
    }

    pub fn text(&self, node: Node<'_>) -> &str {
        match self.files.last() {
            Some(frame) => node.utf8_text(frame.content.as_bytes()).unwrap_or(""),
            None => "",
        }
    }

    pub fn location(&self, node: Node<'_>) -> Location {
        let start = node.start_position();
        Location {
            file: self.current_uid(),
            line: start.row as u32 + 1,
            column: start.column as u32 + 1,
            offset: node.start_byte() as u32,
        }
    }

    fn diagnose(&mut self, location: Location, message: String) {
        let file = self.sources.info(location.file).path.clone();
        tracing::debug!(file = %file, line = location.line, message = %message, "front-end diagnostic");
        self.diagnostics.push(FrontEndDiagnostic {
            file,
            line: location.line,
            message,
        });
    }

    pub fn walk_children(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.walk(child);
        }
    }

    pub fn walk(&mut self, node: Node<'_>) {
        match node.kind() {
            "preproc_include" => self.include_directive(node),
            "preproc_def" => self.define(node, false),
            "preproc_function_def" => self.define(node, true),
            "preproc_call" => self.preproc_call(node),
            "preproc_ifdef" | "preproc_if" | "preproc_elif" | "preproc_elifdef" => self.conditional(node),
            "preproc_else" => self.walk_children(node),
            "comment" | "string_literal" | "raw_string_literal" | "char_literal" | "number_literal"
            | "system_lib_string" | "concatenated_string" => {}
            _ => self.visit_code(node),
        }
    }

    // -----------------------------------------------------------------------
    // Includes
    // -----------------------------------------------------------------------

    fn include_directive(&mut self, node: Node<'_>) {
        let Some(path_node) = node.child_by_field_name("path") else {
            return;
        };
        let location = self.location(path_node);
        let raw = self.text(path_node).trim().to_string();

        let spelling = match split_include_spelling(&raw) {
            Some(spelling) => Some(spelling),
            None => {
                // `#include MACRO`
                self.report_macro(MacroEvent::Expands, &raw, location);
                self.macros
                    .definition(&raw)
                    .and_then(|definition| split_include_spelling(definition.body.trim()))
            }
        };

        match spelling {
            Some((spelled, is_angled)) => self.include(&spelled, is_angled, location),
            None => self.diagnose(location, format!("malformed include: {raw}")),
        }
    }

    fn include(&mut self, spelled: &str, is_angled: bool, location: Location) {
        let includer = self.current_uid();
        let loaded = match self
            .sources
            .resolve_include(spelled, is_angled, includer, self.invocation)
        {
            Some((path, is_system)) => match self.sources.load(&path, is_system) {
                Ok(uid) => Some(uid),
                Err(error) => {
                    self.diagnose(location, error.to_string());
                    None
                }
            },
            None => {
                let error = ParserError::FileNotFound {
                    path: spelled.to_string(),
                };
                self.diagnose(location, error.to_string());
                None
            }
        };

        if !self.silent {
            let directive = InclusionDirective {
                includer: self.sources.info(includer),
                spelled_name: spelled,
                is_angled,
                file: loaded.map(|uid| self.sources.info(uid)),
                location,
            };
            self.callbacks.inclusion_directive(&directive);
        }

        let Some(uid) = loaded else {
            return;
        };
        if self.should_skip(uid) {
            if !self.silent {
                self.callbacks.file_skipped(self.sources.info(uid));
            }
            return;
        }
        if self.files.len() >= MAX_INCLUDE_DEPTH {
            let error = ParserError::IncludeDepthExceeded {
                path: self.sources.info(uid).path.clone(),
                depth: MAX_INCLUDE_DEPTH,
            };
            self.diagnose(location, error.to_string());
            return;
        }

        let source_type = if self.sources.info(uid).is_system {
            SourceType::SystemInclude
        } else {
            SourceType::UserInclude
        };
        self.enter_file(uid, source_type, &[]);
    }

    /// Multiple-include optimization: a guarded header whose guard is still
    /// defined, or a `#pragma once` header, is entered only once.
    fn should_skip(&self, uid: FileUid) -> bool {
        let file = self.sources.file(uid);
        if file.times_entered == 0 {
            return false;
        }
        file.pragma_once
            || file
                .guard
                .as_ref()
                .is_some_and(|guard| self.macros.is_defined(&guard.name))
    }

    // -----------------------------------------------------------------------
    // Macro directives
    // -----------------------------------------------------------------------

    fn define(&mut self, node: Node<'_>, function_like: bool) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node).to_string();
        let parameters = if function_like {
            node.child_by_field_name("parameters")
                .map(|params| self.macro_parameters(params))
        } else {
            None
        };
        let body = node
            .child_by_field_name("value")
            .map(|value| self.text(value).trim().to_string())
            .unwrap_or_default();
        let location = self.location(name_node);
        let used_for_header_guard = self
            .files
            .last()
            .and_then(|frame| frame.guard_define)
            .is_some_and(|id| id == node.id());
        let path = self.sources.info(location.file).path.clone();

        let definition = self.macros.define(PendingDefinition {
            name: &name,
            parameters,
            body,
            location: Some(location),
            file_path: Some(&path),
            used_for_header_guard,
        });
        if !self.silent {
            self.callbacks.macro_defined(definition);
        }
    }

    fn macro_parameters(&self, params: Node<'_>) -> Vec<String> {
        let mut cursor = params.walk();
        params
            .children(&mut cursor)
            .filter_map(|child| match child.kind() {
                "identifier" => Some(self.text(child).to_string()),
                "..." => Some("...".to_string()),
                _ => None,
            })
            .collect()
    }

    fn preproc_call(&mut self, node: Node<'_>) {
        let Some(directive) = node.child_by_field_name("directive") else {
            return;
        };
        let directive = self.text(directive).trim_start_matches('#').trim().to_string();
        let argument = node.child_by_field_name("argument");

        match directive.as_str() {
            "undef" => {
                let Some(argument) = argument else {
                    return;
                };
                let text = self.text(argument);
                let Some(name) = text.split_whitespace().next().map(str::to_string) else {
                    return;
                };
                let skipped = text.find(name.as_str()).unwrap_or(0);
                let mut location = self.location(argument);
                location.column += skipped as u32;
                location.offset += skipped as u32;

                let removed = self.macros.undefine(&name);
                if !self.silent {
                    let token = MacroNameToken {
                        name: &name,
                        location,
                        definition: removed.as_ref(),
                    };
                    self.callbacks.macro_undefined(&token);
                }
            }
            "pragma" => {
                let is_once = argument.is_some_and(|argument| self.text(argument).trim() == "once");
                if is_once {
                    let uid = self.current_uid();
                    self.sources.file_mut(uid).pragma_once = true;
                }
            }
            _ => {}
        }
    }

    fn report_macro(&mut self, event: MacroEvent, name: &str, location: Location) {
        if self.silent {
            return;
        }
        let token = MacroNameToken {
            name,
            location,
            definition: self.macros.definition(name),
        };
        match event {
            MacroEvent::Expands => self.callbacks.macro_expands(&token),
            MacroEvent::Ifdef => self.callbacks.ifdef(&token),
            MacroEvent::Ifndef => self.callbacks.ifndef(&token),
            MacroEvent::Defined => self.callbacks.defined(&token),
        }
    }

    /// Report a use of a macro in code; returns whether `name` is a macro.
    pub fn macro_expansion(&mut self, name: &str, node: Node<'_>) -> bool {
        if !self.macros.is_defined(name) {
            return false;
        }
        let location = self.location(node);
        self.report_macro(MacroEvent::Expands, name, location);
        true
    }

    // -----------------------------------------------------------------------
    // Conditional compilation
    // -----------------------------------------------------------------------

    fn conditional(&mut self, node: Node<'_>) {
        let mut excluded = Vec::new();
        let taken = match node.kind() {
            "preproc_ifdef" | "preproc_elifdef" => {
                let Some(name_node) = node.child_by_field_name("name") else {
                    return;
                };
                excluded.push(name_node.id());
                let negated = node
                    .child(0)
                    .is_some_and(|directive| directive.kind().ends_with("ndef"));
                let name = self.text(name_node).to_string();
                let location = self.location(name_node);
                let event = if negated {
                    MacroEvent::Ifndef
                } else {
                    MacroEvent::Ifdef
                };
                self.report_macro(event, &name, location);
                self.macros.is_defined(&name) != negated
            }
            _ => match node.child_by_field_name("condition") {
                Some(condition_node) => {
                    excluded.push(condition_node.id());
                    condition::evaluate(condition_node, self) != 0
                }
                None => false,
            },
        };

        let alternative = node.child_by_field_name("alternative");
        if let Some(alternative) = alternative {
            excluded.push(alternative.id());
        }

        if taken {
            let mut cursor = node.walk();
            let body: Vec<Node<'_>> = node
                .named_children(&mut cursor)
                .filter(|child| !excluded.contains(&child.id()))
                .collect();
            for child in body {
                self.walk(child);
            }
        } else if let Some(alternative) = alternative {
            self.walk(alternative);
        }
    }
}

impl ConditionContext for Walker<'_> {
    fn node_text(&self, node: Node<'_>) -> String {
        self.text(node).to_string()
    }

    fn expand(&mut self, name: &str, node: Node<'_>) -> Option<i64> {
        if !self.macro_expansion(name, node) {
            return None;
        }
        self.macros
            .definition(name)
            .map(|definition| condition::evaluate_body(&definition.body, &self.macros))
    }

    fn defined(&mut self, name: &str, node: Node<'_>) -> bool {
        let location = self.location(node);
        self.report_macro(MacroEvent::Defined, name, location);
        self.macros.is_defined(name)
    }
}

fn split_include_spelling(raw: &str) -> Option<(String, bool)> {
    if raw.len() >= 2 && raw.starts_with('<') && raw.ends_with('>') {
        Some((raw[1..raw.len() - 1].to_string(), true))
    } else if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        Some((raw[1..raw.len() - 1].to_string(), false))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_spellings() {
        assert_eq!(split_include_spelling("<vector>"), Some(("vector".into(), true)));
        assert_eq!(split_include_spelling("\"a/b.h\""), Some(("a/b.h".into(), false)));
        assert_eq!(split_include_spelling("HEADER"), None);
    }
}
