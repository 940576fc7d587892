use std::collections::HashSet;

use ri_core::{SymbolKind, SymbolTags};
use tree_sitter::Node;

use crate::callbacks::{DeclId, DeclOccurrence, OccurrenceRole};
use crate::preprocessor::{Frame, Walker};
use crate::symbol_table::{qualify, NewDecl};
use crate::usr::{self, LeafKind, ScopeKind};

/// Parents under which a bare record or enum specifier is a declaration of
/// its own (`struct Foo;`) rather than the type of a declarator.
const CONTAINER_KINDS: &[&str] = &[
    "translation_unit",
    "declaration_list",
    "field_declaration_list",
    "template_declaration",
    "linkage_specification",
    "preproc_if",
    "preproc_ifdef",
    "preproc_else",
    "preproc_elif",
    "preproc_elifdef",
];

struct Declared<'n> {
    usr: String,
    name: String,
    kind: SymbolKind,
    tags: SymbolTags,
    role: OccurrenceRole,
    name_node: Node<'n>,
    scope: Option<ScopeKind>,
}

/// Frames to undo after a declaration with a qualified name.
enum SavedFrames {
    Pushed(usize),
    Replaced(Vec<Frame>),
}

impl Walker<'_> {
    pub(crate) fn visit_code(&mut self, node: Node<'_>) {
        match node.kind() {
            "namespace_definition" => self.visit_namespace(node),
            "class_specifier" | "struct_specifier" | "union_specifier" => self.visit_record(node),
            "enum_specifier" => self.visit_enum(node),
            "function_definition" => self.visit_function_definition(node),
            "declaration" => self.visit_declaration(node, false),
            "field_declaration" => self.visit_declaration(node, true),
            "type_definition" => self.visit_type_definition(node),
            "alias_declaration" => self.visit_alias(node),
            "lambda_expression" => self.visit_lambda(node),
            "compound_statement" => self.visit_block(node),
            "for_range_loop" => self.visit_range_for(node),
            "parameter_declaration" | "optional_parameter_declaration" => self.visit_parameter(node),
            "identifier" | "type_identifier" => self.visit_name_reference(node),
            "field_identifier" => self.visit_member_reference(node),
            "qualified_identifier" => self.visit_qualified_reference(node),
            "template_parameter_list" | "namespace_identifier" | "destructor_name" | "operator_name"
            | "primitive_type" | "access_specifier" | "auto" | "this" => {}
            _ => self.walk_children(node),
        }
    }

    // -----------------------------------------------------------------------
    // Scopes
    // -----------------------------------------------------------------------

    fn visit_namespace(&mut self, node: Node<'_>) {
        let mut segments = Vec::new();
        match node.child_by_field_name("name") {
            None => segments.push((ScopeKind::AnonymousNamespace, String::new())),
            Some(name) if name.kind() == "nested_namespace_specifier" => {
                collect_namespace_identifiers(name, &mut |ident| {
                    segments.push((ScopeKind::Namespace, self.text(ident).to_string()));
                });
            }
            Some(name) => segments.push((ScopeKind::Namespace, self.text(name).to_string())),
        }

        for (kind, name) in &segments {
            self.frames.push(Frame::Scope {
                kind: *kind,
                name: name.clone(),
            });
            if *kind == ScopeKind::Namespace {
                let qualified = self.enclosing_names().join("::");
                self.symbols.register_scope(&qualified, ScopeKind::Namespace, None);
            }
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.walk(body);
        }
        self.frames.truncate(self.frames.len() - segments.len());
    }

    fn visit_record(&mut self, node: Node<'_>) {
        let (scope_kind, tags) = match node.kind() {
            "class_specifier" => (ScopeKind::Struct, SymbolTags::CLASS),
            "union_specifier" => (ScopeKind::Union, SymbolTags::UNION),
            _ => (ScopeKind::Struct, SymbolTags::STRUCT),
        };
        let body = node.child_by_field_name("body");

        let Some(name_node) = node.child_by_field_name("name") else {
            self.walk_other_children(node, &[]);
            if let Some(body) = body {
                self.frames.push(Frame::Anonymous);
                self.walk(body);
                self.frames.pop();
            }
            return;
        };

        if body.is_none() && !is_standalone(node) {
            // Elaborated type specifier: `struct Foo *p;`
            self.walk(name_node);
            return;
        }

        let (segments, leaf) = self.split_qualified(name_node);
        let leaf = match leaf.kind() {
            "template_type" => leaf.child_by_field_name("name").unwrap_or(leaf),
            _ => leaf,
        };
        if let Some(arguments) = leaf.parent().and_then(|p| p.child_by_field_name("arguments")) {
            self.walk(arguments);
        }
        let saved = self.push_qualifier_frames(&segments);
        let name = self.text(leaf).to_string();
        let role = if body.is_some() {
            OccurrenceRole::Definition
        } else {
            OccurrenceRole::Declaration
        };
        let usr = usr::declaration_usr(&self.usr_prefix(), LeafKind::Record(scope_kind), &name);
        self.declare(Declared {
            usr,
            name: name.clone(),
            kind: SymbolKind::Record,
            tags,
            role,
            name_node: leaf,
            scope: Some(scope_kind),
        });

        self.walk_other_children(node, &[name_node.id()]);
        if let Some(body) = body {
            self.frames.push(Frame::Scope {
                kind: scope_kind,
                name,
            });
            self.walk(body);
            self.frames.pop();
        }
        self.restore_frames(saved);
    }

    fn visit_enum(&mut self, node: Node<'_>) {
        let body = node.child_by_field_name("body");
        let scoped = {
            let mut cursor = node.walk();
            let scoped = node
                .children(&mut cursor)
                .any(|child| matches!(child.kind(), "class" | "struct"));
            scoped
        };
        if let Some(base) = node.child_by_field_name("base") {
            self.walk(base);
        }

        let enum_name = match node.child_by_field_name("name") {
            Some(name_node) if body.is_none() && !is_standalone(node) => {
                self.walk(name_node);
                return;
            }
            Some(name_node) => {
                let name = self.text(name_node).to_string();
                let role = if body.is_some() {
                    OccurrenceRole::Definition
                } else {
                    OccurrenceRole::Declaration
                };
                let usr = usr::declaration_usr(&self.usr_prefix(), LeafKind::Record(ScopeKind::Enum), &name);
                self.declare(Declared {
                    usr,
                    name: name.clone(),
                    kind: SymbolKind::Enumeration,
                    tags: SymbolTags::empty(),
                    role,
                    name_node,
                    scope: Some(ScopeKind::Enum),
                });
                Some(name)
            }
            None => None,
        };

        let Some(body) = body else {
            return;
        };
        if let Some(name) = &enum_name {
            self.frames.push(Frame::Scope {
                kind: ScopeKind::Enum,
                name: name.clone(),
            });
        }
        let mut cursor = body.walk();
        let enumerators: Vec<Node<'_>> = body.named_children(&mut cursor).collect();
        for enumerator in enumerators {
            if enumerator.kind() != "enumerator" {
                self.walk(enumerator);
                continue;
            }
            let Some(name_node) = enumerator.child_by_field_name("name") else {
                continue;
            };
            let name = self.text(name_node).to_string();
            let usr = usr::declaration_usr(&self.usr_prefix(), LeafKind::Enumerator, &name);
            let id = self.declare(Declared {
                usr,
                name: name.clone(),
                kind: SymbolKind::Variable,
                tags: SymbolTags::empty(),
                role: OccurrenceRole::Definition,
                name_node,
                scope: None,
            });
            if let (Some(id), true, Some(_)) = (id, !scoped, &enum_name) {
                let mut outer = self.enclosing_names();
                outer.pop();
                self.symbols.alias(&qualify(&outer, &name), id);
            }
            if let Some(value) = enumerator.child_by_field_name("value") {
                self.walk(value);
            }
        }
        if enum_name.is_some() {
            self.frames.pop();
        }
    }

    // -----------------------------------------------------------------------
    // Functions
    // -----------------------------------------------------------------------

    fn visit_function_definition(&mut self, node: Node<'_>) {
        let function = node
            .child_by_field_name("declarator")
            .and_then(find_function_declarator);
        let Some(function) = function.filter(|_| !self.in_function()) else {
            self.walk_children(node);
            return;
        };

        if let Some(ty) = node.child_by_field_name("type") {
            self.walk(ty);
        }
        let saved = self.declare_function(function, OccurrenceRole::Definition);

        self.frames.push(Frame::Function);
        self.locals.push(HashSet::new());
        self.visit_parameters(function);
        let mut cursor = node.walk();
        let rest: Vec<Node<'_>> = node
            .named_children(&mut cursor)
            .filter(|child| {
                matches!(
                    child.kind(),
                    "field_initializer_list" | "compound_statement" | "try_statement"
                )
            })
            .collect();
        for child in rest {
            self.walk(child);
        }
        self.locals.pop();
        self.frames.pop();
        self.restore_frames(saved);
    }

    /// Declare the function named by `function` (a `function_declarator`).
    /// Qualifier frames stay pushed until the caller restores them.
    fn declare_function(&mut self, function: Node<'_>, role: OccurrenceRole) -> SavedFrames {
        let Some(name_node) = function.child_by_field_name("declarator") else {
            return SavedFrames::Pushed(0);
        };
        let (segments, leaf) = self.split_qualified(name_node);
        let saved = self.push_qualifier_frames(&segments);
        let name = match leaf.kind() {
            "template_function" => leaf
                .child_by_field_name("name")
                .map(|n| self.text(n).to_string())
                .unwrap_or_default(),
            _ => self.text(leaf).to_string(),
        };
        let signature = self.parameter_signature(function);
        let usr = usr::declaration_usr(&self.usr_prefix(), LeafKind::Function { signature: &signature }, &name);
        self.declare(Declared {
            usr,
            name,
            kind: SymbolKind::Function,
            tags: SymbolTags::empty(),
            role,
            name_node: leaf,
            scope: None,
        });
        saved
    }

    fn visit_parameters(&mut self, function: Node<'_>) {
        let Some(parameters) = function.child_by_field_name("parameters") else {
            return;
        };
        let mut cursor = parameters.walk();
        let params: Vec<Node<'_>> = parameters.named_children(&mut cursor).collect();
        for param in params {
            self.walk(param);
        }
    }

    fn visit_parameter(&mut self, param: Node<'_>) {
        if let Some(ty) = param.child_by_field_name("type") {
            self.walk(ty);
        }
        if let Some(name) = param
            .child_by_field_name("declarator")
            .and_then(declarator_name)
        {
            let name = self.text(name).to_string();
            if let Some(scope) = self.locals.last_mut() {
                scope.insert(name);
            }
        }
        if let Some(default_value) = param.child_by_field_name("default_value") {
            self.walk(default_value);
        }
    }

    fn visit_lambda(&mut self, node: Node<'_>) {
        self.frames.push(Frame::Function);
        self.locals.push(HashSet::new());
        if let Some(captures) = node.child_by_field_name("captures") {
            self.walk(captures);
        }
        if let Some(declarator) = node.child_by_field_name("declarator") {
            self.visit_parameters(declarator);
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.walk(body);
        }
        self.locals.pop();
        self.frames.pop();
    }

    fn visit_block(&mut self, node: Node<'_>) {
        self.locals.push(HashSet::new());
        self.walk_children(node);
        self.locals.pop();
    }

    fn visit_range_for(&mut self, node: Node<'_>) {
        self.locals.push(HashSet::new());
        if let Some(ty) = node.child_by_field_name("type") {
            self.walk(ty);
        }
        if let Some(name) = node
            .child_by_field_name("declarator")
            .and_then(declarator_name)
        {
            let name = self.text(name).to_string();
            if let Some(scope) = self.locals.last_mut() {
                scope.insert(name);
            }
        }
        if let Some(right) = node.child_by_field_name("right") {
            self.walk(right);
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.walk(body);
        }
        self.locals.pop();
    }

    // -----------------------------------------------------------------------
    // Variables, fields, typedefs
    // -----------------------------------------------------------------------

    fn visit_declaration(&mut self, node: Node<'_>, is_field: bool) {
        let declarators: Vec<Node<'_>> = {
            let mut cursor = node.walk();
            node.children_by_field_name("declarator", &mut cursor)
                .collect()
        };
        let type_node = node.child_by_field_name("type");
        let is_extern = self.has_storage_class(node, "extern");
        let is_static = self.has_storage_class(node, "static");

        if let Some(ty) = type_node {
            self.walk(ty);
        }

        if self.in_function() {
            for declarator in declarators {
                let (target, value) = split_init_declarator(declarator);
                if let Some(name) = declarator_name(target) {
                    let name = self.text(name).to_string();
                    if let Some(scope) = self.locals.last_mut() {
                        scope.insert(name);
                    }
                }
                if let Some(value) = value {
                    self.walk(value);
                }
            }
            return;
        }

        for declarator in declarators {
            if let Some(function) = find_function_declarator(declarator) {
                let saved = self.declare_function(function, OccurrenceRole::Declaration);
                self.locals.push(HashSet::new());
                self.visit_parameters(function);
                self.locals.pop();
                self.restore_frames(saved);
                continue;
            }

            let (target, value) = split_init_declarator(declarator);
            let Some(name_node) = declarator_name(target) else {
                continue;
            };
            let (segments, leaf) = self.split_qualified(name_node);
            let saved = self.push_qualifier_frames(&segments);
            let name = self.text(leaf).to_string();

            let leaf_kind = if is_field && !is_static {
                LeafKind::Field
            } else {
                LeafKind::Variable
            };
            let role = if is_extern || (is_field && is_static) {
                OccurrenceRole::Declaration
            } else {
                OccurrenceRole::Definition
            };
            let usr = usr::declaration_usr(&self.usr_prefix(), leaf_kind, &name);
            self.declare(Declared {
                usr,
                name,
                kind: SymbolKind::Variable,
                tags: SymbolTags::empty(),
                role,
                name_node: leaf,
                scope: None,
            });
            if let Some(value) = value {
                self.walk(value);
            }
            self.restore_frames(saved);
        }

        if let Some(default_value) = node.child_by_field_name("default_value") {
            self.walk(default_value);
        }
    }

    fn visit_type_definition(&mut self, node: Node<'_>) {
        if let Some(ty) = node.child_by_field_name("type") {
            self.walk(ty);
        }
        let declarators: Vec<Node<'_>> = {
            let mut cursor = node.walk();
            node.children_by_field_name("declarator", &mut cursor)
                .collect()
        };
        for declarator in declarators {
            if let Some(name_node) = declarator_name(declarator) {
                self.declare_typedef(name_node);
            }
        }
    }

    fn visit_alias(&mut self, node: Node<'_>) {
        if let Some(ty) = node.child_by_field_name("type") {
            self.walk(ty);
        }
        if let Some(name_node) = node.child_by_field_name("name") {
            self.declare_typedef(name_node);
        }
    }

    fn declare_typedef(&mut self, name_node: Node<'_>) {
        let name = self.text(name_node).to_string();
        if self.in_function() {
            if let Some(scope) = self.locals.last_mut() {
                scope.insert(name);
            }
            return;
        }
        let usr = usr::declaration_usr(&self.usr_prefix(), LeafKind::Typedef, &name);
        self.declare(Declared {
            usr,
            name,
            kind: SymbolKind::None,
            tags: SymbolTags::empty(),
            role: OccurrenceRole::Definition,
            name_node,
            scope: None,
        });
    }

    // -----------------------------------------------------------------------
    // References
    // -----------------------------------------------------------------------

    fn visit_name_reference(&mut self, node: Node<'_>) {
        if self.declared_names.contains(&(self.current_uid(), node.id())) {
            return;
        }
        let name = self.text(node).to_string();
        if self.macro_expansion(&name, node) || self.is_local(&name) {
            return;
        }
        let enclosing = self.enclosing_names();
        if let Some(id) = self.symbols.lookup(&enclosing, &name) {
            self.emit_occurrence(id, OccurrenceRole::Reference, node);
        }
    }

    fn visit_member_reference(&mut self, node: Node<'_>) {
        if self.declared_names.contains(&(self.current_uid(), node.id())) {
            return;
        }
        let name = self.text(node).to_string();
        if self.macro_expansion(&name, node) {
            return;
        }
        let enclosing = self.enclosing_names();
        let id = self
            .symbols
            .lookup(&enclosing, &name)
            .or_else(|| self.symbols.lookup_member(&name));
        if let Some(id) = id {
            self.emit_occurrence(id, OccurrenceRole::Reference, node);
        }
    }

    fn visit_qualified_reference(&mut self, node: Node<'_>) {
        let (segments, leaf) = self.split_qualified(node);
        let enclosing = self.enclosing_names();
        let mut path: Vec<String> = Vec::new();
        for (segment, segment_node) in &segments {
            path.push(segment.clone());
            if let Some(id) = self.symbols.lookup(&enclosing, &path.join("::")) {
                self.emit_occurrence(id, OccurrenceRole::Reference, *segment_node);
            }
        }

        let (name_node, arguments) = match leaf.kind() {
            "template_function" | "template_type" => {
                (leaf.child_by_field_name("name"), leaf.child_by_field_name("arguments"))
            }
            _ => (Some(leaf), None),
        };
        if let Some(name_node) = name_node {
            let name = self.text(name_node).to_string();
            path.push(name);
            if let Some(id) = self.symbols.lookup(&enclosing, &path.join("::")) {
                self.emit_occurrence(id, OccurrenceRole::Reference, name_node);
            }
        }
        if let Some(arguments) = arguments {
            self.walk(arguments);
        }
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    /// Register a declaration and report it. Declarations inside functions,
    /// anonymous records and system headers are registered for lookup but
    /// not reported.
    fn declare(&mut self, declared: Declared<'_>) -> Option<DeclId> {
        if self.in_function() || self.in_anonymous_record() {
            return None;
        }
        let enclosing = self.enclosing_names();
        let qualified_name = qualify(&enclosing, &declared.name);
        let is_member = matches!(
            self.frames.last(),
            Some(Frame::Scope {
                kind: ScopeKind::Struct | ScopeKind::Union,
                ..
            })
        );
        let id = self.symbols.declare(NewDecl {
            usr: declared.usr,
            qualified_name: &qualified_name,
            name: &declared.name,
            kind: declared.kind,
            tags: declared.tags,
            in_system_header: self.in_system_file(),
            is_member,
        });
        if let Some(scope) = declared.scope {
            self.symbols.register_scope(&qualified_name, scope, Some(id));
        }
        self.declared_names
            .insert((self.current_uid(), declared.name_node.id()));
        self.emit_occurrence(id, declared.role, declared.name_node);
        Some(id)
    }

    fn emit_occurrence(&mut self, id: DeclId, role: OccurrenceRole, node: Node<'_>) {
        if self.silent || self.in_system_file() {
            return;
        }
        let location = self.location(node);
        let info = self.symbols.get(id);
        let occurrence = DeclOccurrence {
            decl: id,
            usr: &info.usr,
            name: &info.name,
            kind: info.kind,
            tags: info.tags,
            role,
            location,
            in_system_header: info.in_system_header,
        };
        self.callbacks.occurrence(&occurrence);
    }

    fn in_function(&self) -> bool {
        self.frames.iter().any(|frame| matches!(frame, Frame::Function))
    }

    fn in_anonymous_record(&self) -> bool {
        self.frames.iter().any(|frame| matches!(frame, Frame::Anonymous))
    }

    fn is_local(&self, name: &str) -> bool {
        self.locals.iter().any(|scope| scope.contains(name))
    }

    /// Names of the enclosing scopes usable for lookup, outermost first.
    fn enclosing_names(&self) -> Vec<String> {
        self.frames
            .iter()
            .filter_map(|frame| match frame {
                Frame::Scope { kind, name } if *kind != ScopeKind::AnonymousNamespace => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    fn usr_prefix(&self) -> String {
        usr::scope_prefix(self.frames.iter().filter_map(|frame| match frame {
            Frame::Scope { kind, name } => Some((*kind, name.as_str())),
            _ => None,
        }))
    }

    fn has_storage_class(&self, node: Node<'_>, class: &str) -> bool {
        let mut cursor = node.walk();
        let found = node
            .named_children(&mut cursor)
            .any(|child| child.kind() == "storage_class_specifier" && self.text(child) == class);
        found
    }

    /// Split `a::B::name` into its scope segments and the final name node.
    fn split_qualified<'n>(&self, node: Node<'n>) -> (Vec<(String, Node<'n>)>, Node<'n>) {
        let mut segments = Vec::new();
        let mut current = node;
        while current.kind() == "qualified_identifier" {
            if let Some(scope) = current.child_by_field_name("scope") {
                let scope_name = match scope.kind() {
                    "template_type" => scope.child_by_field_name("name").unwrap_or(scope),
                    _ => scope,
                };
                segments.push((self.text(scope_name).to_string(), scope_name));
            }
            match current.child_by_field_name("name") {
                Some(name) => current = name,
                None => break,
            }
        }
        (segments, current)
    }

    /// Enter the scopes named by a qualified declarator (`Foo::bar`), so
    /// USR and member lookup see the declaration where it belongs.
    fn push_qualifier_frames(&mut self, segments: &[(String, Node<'_>)]) -> SavedFrames {
        if segments.is_empty() {
            return SavedFrames::Pushed(0);
        }
        let enclosing = self.enclosing_names();
        let mut path = Vec::new();
        for (segment, segment_node) in segments {
            path.push(segment.clone());
            if let Some(id) = self.symbols.lookup(&enclosing, &path.join("::")) {
                self.emit_occurrence(id, OccurrenceRole::Reference, *segment_node);
            }
        }

        let resolved = self
            .symbols
            .resolve_scope(&enclosing, &path)
            .unwrap_or_else(|| qualify(&enclosing, &path.join("::")));
        let resolved: Vec<&str> = resolved.split("::").collect();
        let common = enclosing
            .iter()
            .zip(&resolved)
            .take_while(|(a, b)| a.as_str() == **b)
            .count();

        let frames_for = |walker: &Self, range: std::ops::Range<usize>| -> Vec<Frame> {
            range
                .map(|i| Frame::Scope {
                    kind: walker
                        .symbols
                        .scope_kind(&resolved[..=i].join("::"))
                        .unwrap_or(ScopeKind::Struct),
                    name: resolved[i].to_string(),
                })
                .collect()
        };

        if common == enclosing.len() {
            let extra = frames_for(self, common..resolved.len());
            let count = extra.len();
            self.frames.extend(extra);
            SavedFrames::Pushed(count)
        } else {
            let replacement = frames_for(self, 0..resolved.len());
            SavedFrames::Replaced(std::mem::replace(&mut self.frames, replacement))
        }
    }

    fn restore_frames(&mut self, saved: SavedFrames) {
        match saved {
            SavedFrames::Pushed(count) => {
                let len = self.frames.len().saturating_sub(count);
                self.frames.truncate(len);
            }
            SavedFrames::Replaced(frames) => self.frames = frames,
        }
    }

    fn parameter_signature(&self, function: Node<'_>) -> String {
        let Some(parameters) = function.child_by_field_name("parameters") else {
            return String::new();
        };
        let mut cursor = parameters.walk();
        let mut types: Vec<String> = parameters
            .children(&mut cursor)
            .filter_map(|param| match param.kind() {
                "parameter_declaration" | "optional_parameter_declaration" => Some(self.parameter_type(param)),
                "variadic_parameter_declaration" | "variadic_parameter" | "..." => Some("...".to_string()),
                _ => None,
            })
            .collect();
        if types.len() == 1 && types[0] == "void" {
            types.clear();
        }
        usr::signature(types.iter().map(String::as_str))
    }

    fn parameter_type(&self, param: Node<'_>) -> String {
        let mut parts: Vec<String> = Vec::new();
        let mut cursor = param.walk();
        for child in param.named_children(&mut cursor) {
            if child.kind() == "type_qualifier" {
                parts.push(self.text(child).to_string());
            }
        }
        if let Some(ty) = param.child_by_field_name("type") {
            parts.push(self.text(ty).to_string());
        }

        let mut suffix = String::new();
        let mut declarator = param.child_by_field_name("declarator");
        while let Some(current) = declarator {
            match current.kind() {
                "pointer_declarator" | "abstract_pointer_declarator" => suffix.push('*'),
                "reference_declarator" | "abstract_reference_declarator" => {
                    suffix.push_str(if self.text(current).starts_with("&&") { "&&" } else { "&" });
                }
                "array_declarator" | "abstract_array_declarator" => suffix.push_str("[]"),
                _ => {}
            }
            declarator = inner_declarator(current);
        }

        let mut spelled = parts.join(" ");
        if !suffix.is_empty() {
            spelled.push(' ');
            spelled.push_str(&suffix);
        }
        spelled
    }

    fn walk_other_children(&mut self, node: Node<'_>, skip: &[usize]) {
        let body = node.child_by_field_name("body").map(|b| b.id());
        let name = node.child_by_field_name("name").map(|n| n.id());
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node
            .named_children(&mut cursor)
            .filter(|child| {
                Some(child.id()) != body && Some(child.id()) != name && !skip.contains(&child.id())
            })
            .collect();
        for child in children {
            self.walk(child);
        }
    }
}

fn is_standalone(node: Node<'_>) -> bool {
    node.parent()
        .is_some_and(|parent| CONTAINER_KINDS.contains(&parent.kind()))
}

fn collect_namespace_identifiers<'n>(node: Node<'n>, out: &mut impl FnMut(Node<'n>)) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "namespace_identifier" => out(child),
            "nested_namespace_specifier" => collect_namespace_identifiers(child, out),
            _ => {}
        }
    }
}

fn split_init_declarator(declarator: Node<'_>) -> (Node<'_>, Option<Node<'_>>) {
    if declarator.kind() == "init_declarator" {
        let target = declarator
            .child_by_field_name("declarator")
            .unwrap_or(declarator);
        (target, declarator.child_by_field_name("value"))
    } else {
        (declarator, None)
    }
}

/// The declarator nested inside `node`, skipping qualifiers and attributes.
fn inner_declarator(node: Node<'_>) -> Option<Node<'_>> {
    if let Some(inner) = node.child_by_field_name("declarator") {
        return Some(inner);
    }
    let mut cursor = node.walk();
    let inner = node.named_children(&mut cursor).find(|child| {
        !matches!(
            child.kind(),
            "type_qualifier" | "ms_pointer_modifier" | "attribute_specifier" | "attribute_declaration"
        )
    });
    inner
}

/// The node naming the entity a declarator declares.
fn declarator_name(node: Node<'_>) -> Option<Node<'_>> {
    match node.kind() {
        "identifier" | "field_identifier" | "type_identifier" | "qualified_identifier" | "destructor_name"
        | "operator_name" | "template_function" => Some(node),
        "init_declarator" | "pointer_declarator" | "reference_declarator" | "array_declarator"
        | "function_declarator" | "parenthesized_declarator" | "attributed_declarator" => {
            inner_declarator(node).and_then(declarator_name)
        }
        _ => None,
    }
}

/// The `function_declarator` of a function (not function pointer) declarator.
fn find_function_declarator(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node;
    loop {
        match current.kind() {
            "function_declarator" => {
                let inner = current.child_by_field_name("declarator")?;
                return (inner.kind() != "parenthesized_declarator").then_some(current);
            }
            "pointer_declarator" | "reference_declarator" | "attributed_declarator" => {
                current = inner_declarator(current)?;
            }
            _ => return None,
        }
    }
}
