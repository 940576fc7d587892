use tree_sitter::Node;

use super::{Matcher, NodeKind};

const DECLARATOR_WRAPPERS: &[&str] = &[
    "pointer_declarator",
    "reference_declarator",
    "parenthesized_declarator",
    "init_declarator",
    "array_declarator",
    "attributed_declarator",
];

/// Evaluates matchers against the nodes of one parsed file.
pub struct Evaluator<'s> {
    source: &'s [u8],
}

impl<'s> Evaluator<'s> {
    pub fn new(source: &'s str) -> Self {
        Self {
            source: source.as_bytes(),
        }
    }

    /// Every node of the tree under `root` that `matcher` accepts, in
    /// document order.
    pub fn find_all<'t>(&self, matcher: &Matcher, root: Node<'t>) -> Vec<Node<'t>> {
        let mut found = Vec::new();
        let mut cursor = root.walk();
        loop {
            let node = cursor.node();
            if node.is_named() && self.matches(matcher, node) {
                found.push(node);
            }
            if cursor.goto_first_child() || cursor.goto_next_sibling() {
                continue;
            }
            loop {
                if !cursor.goto_parent() {
                    return found;
                }
                if cursor.goto_next_sibling() {
                    break;
                }
            }
        }
    }

    pub fn matches(&self, matcher: &Matcher, node: Node<'_>) -> bool {
        match matcher {
            Matcher::Node { kind, inner, .. } => {
                self.is_kind(*kind, node) && inner.iter().all(|m| self.matches(m, node))
            }
            Matcher::Anything => true,
            Matcher::AllOf(all) => all.iter().all(|m| self.matches(m, node)),
            Matcher::AnyOf(any) => any.iter().any(|m| self.matches(m, node)),
            Matcher::Unless(inner) => !self.matches(inner, node),

            Matcher::HasName(pattern) => self
                .declared_names(node)
                .iter()
                .any(|name| has_name(pattern, name)),
            Matcher::MatchesName(regex) => self
                .declared_names(node)
                .iter()
                .any(|name| regex.is_match(&format!("::{name}"))),
            Matcher::HasOperatorName(operator) => node.kind() == "binary_expression"
                && node
                    .child_by_field_name("operator")
                    .is_some_and(|op| self.text(op) == operator),
            Matcher::IsDefinition => self.is_definition(node),
            Matcher::IsExpansionInMainFile => true,
            Matcher::ParameterCountIs(count) => {
                function_declarator(node)
                    .and_then(|declarator| declarator.child_by_field_name("parameters"))
                    .map(|parameters| self.parameter_count(parameters))
                    == Some(*count as usize)
            }
            Matcher::ArgumentCountIs(count) => {
                call_arguments(node).map(|arguments| arguments.len()) == Some(*count as usize)
            }

            Matcher::Has(inner) => {
                named_children(node).any(|child| self.matches(inner, child))
            }
            Matcher::HasDescendant(inner) => self.has_descendant(inner, node),
            Matcher::HasParent(inner) => node.parent().is_some_and(|parent| self.matches(inner, parent)),
            Matcher::HasAncestor(inner) => {
                let mut current = node.parent();
                while let Some(ancestor) = current {
                    if self.matches(inner, ancestor) {
                        return true;
                    }
                    current = ancestor.parent();
                }
                false
            }
            Matcher::Callee(inner) => match node.child_by_field_name("function") {
                Some(callee) if node.kind() == "call_expression" => self.matches_callee(inner, callee),
                _ => false,
            },
            Matcher::HasBody(inner) => match node.kind() {
                "function_definition" | "for_statement" | "for_range_loop" | "while_statement"
                | "do_statement" => node
                    .child_by_field_name("body")
                    .is_some_and(|body| self.matches(inner, body)),
                _ => false,
            },
            Matcher::HasCondition(inner) => match node.kind() {
                "if_statement" | "while_statement" | "for_statement" | "do_statement" => node
                    .child_by_field_name("condition")
                    .map(unwrap_condition)
                    .is_some_and(|condition| self.matches(inner, condition)),
                _ => false,
            },
            Matcher::HasArgument(index, inner) => call_arguments(node)
                .and_then(|arguments| arguments.get(*index as usize).copied())
                .is_some_and(|argument| self.matches(inner, argument)),
        }
    }

    /// A call's callee is matched either as an expression or, for
    /// `functionDecl(...)`, by the name it refers to.
    fn matches_callee(&self, matcher: &Matcher, callee: Node<'_>) -> bool {
        match matcher {
            Matcher::Node {
                kind: NodeKind::FunctionDecl,
                inner,
                ..
            } => {
                let Some(name) = callee_name(callee) else {
                    return false;
                };
                let name = self.text(name);
                inner.iter().all(|m| matches_name_only(m, name))
            }
            _ => self.matches(matcher, callee),
        }
    }

    fn has_descendant(&self, matcher: &Matcher, node: Node<'_>) -> bool {
        named_children(node).any(|child| self.matches(matcher, child) || self.has_descendant(matcher, child))
    }

    /// Qualified names a declaration or reference introduces. Most nodes
    /// have one; a declaration of several variables has one per variable.
    pub fn declared_names(&self, node: Node<'_>) -> Vec<String> {
        let scope = || self.scope_prefix(node);
        match node.kind() {
            "function_definition" | "declaration" | "field_declaration" | "parameter_declaration"
            | "optional_parameter_declaration" | "type_definition" => declarators(node)
                .filter_map(declarator_name)
                .map(|name| format!("{}{}", scope(), self.text(name)))
                .collect(),
            "struct_specifier" | "class_specifier" | "union_specifier" | "enum_specifier"
            | "enumerator" | "namespace_definition" | "alias_declaration" => {
                match node.child_by_field_name("name") {
                    Some(name) => vec![format!("{}{}", scope(), self.text(name))],
                    None if node.kind() == "namespace_definition" => {
                        vec![format!("{}(anonymous namespace)", scope())]
                    }
                    None => Vec::new(),
                }
            }
            "call_expression" => node
                .child_by_field_name("function")
                .and_then(callee_name)
                .map(|name| vec![self.text(name).to_string()])
                .unwrap_or_default(),
            "identifier" | "qualified_identifier" => vec![self.text(node).to_string()],
            "field_expression" => node
                .child_by_field_name("field")
                .map(|field| vec![self.text(field).to_string()])
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// `ns::Class::` for a node nested in `namespace ns { class Class {`.
    fn scope_prefix(&self, node: Node<'_>) -> String {
        let mut scopes = Vec::new();
        let mut current = node.parent();
        while let Some(ancestor) = current {
            match ancestor.kind() {
                "namespace_definition" => scopes.push(
                    ancestor
                        .child_by_field_name("name")
                        .map_or("(anonymous namespace)", |name| self.text(name)),
                ),
                "struct_specifier" | "class_specifier" | "union_specifier" => {
                    if let Some(name) = ancestor.child_by_field_name("name") {
                        scopes.push(self.text(name));
                    }
                }
                _ => {}
            }
            current = ancestor.parent();
        }
        scopes
            .iter()
            .rev()
            .map(|scope| format!("{scope}::"))
            .collect()
    }

    fn is_definition(&self, node: Node<'_>) -> bool {
        match node.kind() {
            "function_definition" | "namespace_definition" => true,
            "struct_specifier" | "class_specifier" | "union_specifier" | "enum_specifier" => {
                node.child_by_field_name("body").is_some()
            }
            "declaration" => {
                let is_extern = named_children(node).any(|child| {
                    child.kind() == "storage_class_specifier" && self.text(child) == "extern"
                });
                let initialized = declarators(node).any(|d| d.kind() == "init_declarator");
                function_declarator(node).is_none() && (!is_extern || initialized)
            }
            _ => false,
        }
    }

    fn is_kind(&self, kind: NodeKind, node: Node<'_>) -> bool {
        match kind {
            NodeKind::Decl => [
                NodeKind::FunctionDecl,
                NodeKind::RecordDecl,
                NodeKind::VarDecl,
                NodeKind::FieldDecl,
                NodeKind::EnumDecl,
                NodeKind::EnumConstantDecl,
                NodeKind::NamespaceDecl,
                NodeKind::TypedefDecl,
            ]
            .into_iter()
            .any(|kind| self.is_kind(kind, node)),
            NodeKind::FunctionDecl => match node.kind() {
                "function_definition" => true,
                "declaration" | "field_declaration" => function_declarator(node).is_some(),
                _ => false,
            },
            NodeKind::RecordDecl => {
                matches!(node.kind(), "struct_specifier" | "class_specifier" | "union_specifier")
                    && is_type_declaration(node)
            }
            NodeKind::EnumDecl => node.kind() == "enum_specifier" && is_type_declaration(node),
            NodeKind::VarDecl => match node.kind() {
                "declaration" => {
                    declarators(node).next().is_some() && function_declarator(node).is_none()
                }
                "parameter_declaration" | "optional_parameter_declaration" => {
                    node.child_by_field_name("declarator").is_some()
                }
                _ => false,
            },
            NodeKind::ParmVarDecl => {
                matches!(node.kind(), "parameter_declaration" | "optional_parameter_declaration")
                    && node.child_by_field_name("declarator").is_some()
            }
            NodeKind::FieldDecl => {
                node.kind() == "field_declaration"
                    && declarators(node).next().is_some()
                    && function_declarator(node).is_none()
            }
            NodeKind::EnumConstantDecl => node.kind() == "enumerator",
            NodeKind::NamespaceDecl => node.kind() == "namespace_definition",
            NodeKind::TypedefDecl => matches!(node.kind(), "type_definition" | "alias_declaration"),
            NodeKind::CallExpr => node.kind() == "call_expression",
            NodeKind::DeclRefExpr => is_decl_ref(node),
            NodeKind::MemberExpr => node.kind() == "field_expression",
            NodeKind::BinaryOperator => node.kind() == "binary_expression",
            NodeKind::IfStmt => node.kind() == "if_statement",
            NodeKind::ForStmt => matches!(node.kind(), "for_statement" | "for_range_loop"),
            NodeKind::WhileStmt => node.kind() == "while_statement",
            NodeKind::ReturnStmt => node.kind() == "return_statement",
            NodeKind::CompoundStmt => node.kind() == "compound_statement",
            NodeKind::StringLiteral => matches!(node.kind(), "string_literal" | "raw_string_literal"),
            NodeKind::IntegerLiteral => {
                node.kind() == "number_literal" && is_integer_literal(self.text(node))
            }
        }
    }

    fn parameter_count(&self, parameters: Node<'_>) -> usize {
        let parameters: Vec<Node<'_>> = named_children(parameters)
            .filter(|p| p.kind() != "variadic_parameter")
            .collect();
        // f(void) declares no parameters.
        match parameters.as_slice() {
            [only] if self.text(*only) == "void" => 0,
            _ => parameters.len(),
        }
    }

    fn text(&self, node: Node<'_>) -> &'s str {
        std::str::from_utf8(&self.source[node.byte_range()]).unwrap_or("")
    }
}

/// A record or enum specifier that declares the type: it has a body or
/// stands alone as `struct S;`.
fn is_type_declaration(node: Node<'_>) -> bool {
    node.child_by_field_name("body").is_some()
        || node.next_sibling().is_some_and(|next| next.kind() == ";")
}

fn is_integer_literal(text: &str) -> bool {
    let text = text.to_ascii_lowercase();
    if text.starts_with("0x") {
        !text.contains(['.', 'p'])
    } else {
        !text.contains(['.', 'e'])
    }
}

/// An identifier used as an expression rather than declared.
fn is_decl_ref(node: Node<'_>) -> bool {
    if !matches!(node.kind(), "identifier" | "qualified_identifier") {
        return false;
    }
    let Some(parent) = node.parent() else {
        return false;
    };
    if parent.kind() == "qualified_identifier" || parent.kind().starts_with("preproc_") {
        return false;
    }
    let is_field = |field: &str| parent.child_by_field_name(field).is_some_and(|child| child.id() == node.id());
    !(is_field("declarator") || is_field("name") || is_field("label"))
}

fn named_children<'t>(node: Node<'t>) -> impl Iterator<Item = Node<'t>> {
    (0..node.named_child_count())
        .filter_map(move |i| node.named_child(i))
        .filter(|child| child.kind() != "comment")
}

/// The `declarator` fields of a declaration, in order.
fn declarators<'t>(node: Node<'t>) -> impl Iterator<Item = Node<'t>> {
    let mut cursor = node.walk();
    let found: Vec<Node<'t>> = node.children_by_field_name("declarator", &mut cursor).collect();
    found.into_iter()
}

/// Strip pointer, reference, array and initializer wrappers.
fn unwrap_declarator(mut node: Node<'_>) -> Node<'_> {
    while DECLARATOR_WRAPPERS.contains(&node.kind()) {
        match node
            .child_by_field_name("declarator")
            .or_else(|| node.named_child(0))
        {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

/// The function declarator of a function declaration or definition.
/// Function pointers (`int (*fp)(int)`) are variables and yield `None`.
fn function_declarator(node: Node<'_>) -> Option<Node<'_>> {
    let declarator = unwrap_declarator(declarators(node).next()?);
    if declarator.kind() != "function_declarator" {
        return None;
    }
    match declarator.child_by_field_name("declarator") {
        Some(inner) if inner.kind() == "parenthesized_declarator" => None,
        _ => Some(declarator),
    }
}

/// The name node a declarator introduces.
fn declarator_name(declarator: Node<'_>) -> Option<Node<'_>> {
    let mut node = unwrap_declarator(declarator);
    while node.kind() == "function_declarator" {
        node = unwrap_declarator(node.child_by_field_name("declarator")?);
    }
    Some(node)
}

fn callee_name(callee: Node<'_>) -> Option<Node<'_>> {
    match callee.kind() {
        "identifier" | "qualified_identifier" => Some(callee),
        "field_expression" => callee.child_by_field_name("field"),
        "template_function" => callee.child_by_field_name("name"),
        "parenthesized_expression" => callee.named_child(0).and_then(callee_name),
        _ => None,
    }
}

fn call_arguments(node: Node<'_>) -> Option<Vec<Node<'_>>> {
    if node.kind() != "call_expression" {
        return None;
    }
    let arguments = node.child_by_field_name("arguments")?;
    Some(named_children(arguments).collect())
}

/// `if (x)` and `while (int y = f())` wrap their condition.
fn unwrap_condition(node: Node<'_>) -> Node<'_> {
    match node.kind() {
        "condition_clause" => node
            .child_by_field_name("value")
            .or_else(|| node.named_child(0))
            .map_or(node, unwrap_condition),
        "parenthesized_expression" => node.named_child(0).unwrap_or(node),
        _ => node,
    }
}

/// `hasName("f")` compares unqualified names; a pattern containing `::`
/// compares the qualified name, anchored at the global scope when it starts
/// with `::`.
fn has_name(pattern: &str, qualified: &str) -> bool {
    if let Some(anchored) = pattern.strip_prefix("::") {
        return qualified == anchored;
    }
    if pattern.contains("::") {
        return qualified == pattern || qualified.ends_with(&format!("::{pattern}"));
    }
    let unqualified = qualified.rsplit("::").next().unwrap_or(qualified);
    unqualified == pattern
}

fn matches_name_only(matcher: &Matcher, name: &str) -> bool {
    match matcher {
        Matcher::HasName(pattern) => has_name(pattern, name),
        Matcher::MatchesName(regex) => regex.is_match(&format!("::{name}")),
        Matcher::Anything | Matcher::IsExpansionInMainFile => true,
        Matcher::AllOf(all) => all.iter().all(|m| matches_name_only(m, name)),
        Matcher::AnyOf(any) => any.iter().any(|m| matches_name_only(m, name)),
        Matcher::Unless(inner) => !matches_name_only(inner, name),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use ri_core::Language;
    use ri_parser::ParserRegistry;

    use super::*;
    use crate::matcher::parse_matcher_expression;

    fn find(language: Language, source: &str, query: &str) -> Vec<String> {
        let mut parser = tree_sitter::Parser::new();
        parser.set_language(&ParserRegistry::grammar(language)).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let matcher = parse_matcher_expression(query).unwrap();
        Evaluator::new(source)
            .find_all(&matcher, tree.root_node())
            .into_iter()
            .map(|node| source[node.byte_range()].to_string())
            .collect()
    }

    const ARITHMETIC: &str = "int add(int a, int b);\n\
                              int add(int a, int b) { return a + b; }\n\
                              int sub(int a);\n";

    #[test]
    fn function_declarations_and_definitions() {
        assert_eq!(find(Language::Cxx, ARITHMETIC, "functionDecl(hasName(\"add\"))").len(), 2);
        let definitions = find(Language::Cxx, ARITHMETIC, "functionDecl(isDefinition())");
        assert_eq!(definitions, vec!["int add(int a, int b) { return a + b; }"]);
        assert_eq!(find(Language::Cxx, ARITHMETIC, "functionDecl(parameterCountIs(1))").len(), 1);
    }

    #[test]
    fn void_parameter_list_is_empty() {
        let found = find(Language::C, "void f(void);\nvoid g(int);\n", "functionDecl(parameterCountIs(0))");
        assert_eq!(found, vec!["void f(void);"]);
    }

    #[test]
    fn qualified_names() {
        let source = "namespace ns { struct Point { int x; }; void move(); }\nstruct Point p;\n";
        assert_eq!(find(Language::Cxx, source, "recordDecl(hasName(\"ns::Point\"))").len(), 1);
        assert_eq!(find(Language::Cxx, source, "recordDecl(hasName(\"::Point\"))").len(), 0);
        assert_eq!(find(Language::Cxx, source, "recordDecl(hasName(\"Point\"))").len(), 1);
        assert_eq!(find(Language::Cxx, source, "functionDecl(matchesName(\"^::ns::\"))").len(), 1);
        assert_eq!(find(Language::Cxx, source, "fieldDecl(hasName(\"ns::Point::x\"))").len(), 1);
    }

    #[test]
    fn callee_by_function_name() {
        let source = "void log(int);\nvoid f() { log(1); other(2); }\n";
        let calls = find(Language::Cxx, source, "callExpr(callee(functionDecl(hasName(\"log\"))))");
        assert_eq!(calls, vec!["log(1)"]);
        let with_one = find(Language::Cxx, source, "callExpr(argumentCountIs(1), hasArgument(0, integerLiteral()))");
        assert_eq!(with_one.len(), 2);
    }

    #[test]
    fn variables_and_references() {
        let source = "int a, b;\nint f() { return b + 1; }\n";
        assert_eq!(find(Language::C, source, "varDecl(hasName(\"b\"))"), vec!["int a, b;"]);
        assert_eq!(find(Language::C, source, "declRefExpr(hasName(\"b\"))"), vec!["b"]);
    }

    #[test]
    fn conditions_and_traversal() {
        let source = "int f(int a) { if (a == 1) return 1; if (a) return 2; return 0; }\n";
        for language in [Language::C, Language::Cxx] {
            let ifs = find(language, source, "ifStmt(hasCondition(binaryOperator(hasOperatorName(\"==\"))))");
            assert_eq!(ifs, vec!["if (a == 1) return 1;"]);
        }
        assert_eq!(
            find(Language::C, source, "returnStmt(hasParent(ifStmt()))").len(),
            2
        );
        assert_eq!(
            find(Language::C, source, "functionDecl(hasDescendant(ifStmt()), unless(parameterCountIs(0)))").len(),
            1
        );
    }

    #[test]
    fn literals() {
        let source = "double d = 1.5;\nint i = 42;\nconst char *s = \"x\";\n";
        assert_eq!(find(Language::C, source, "integerLiteral()"), vec!["42"]);
        assert_eq!(find(Language::C, source, "stringLiteral()"), vec!["\"x\""]);
    }

    #[test]
    fn records_are_not_type_references() {
        let source = "struct S;\nstruct S { int v; };\nstruct S value;\n";
        let records = find(Language::C, source, "recordDecl()");
        assert_eq!(records.len(), 2);
        assert_eq!(find(Language::C, source, "recordDecl(isDefinition())").len(), 1);
    }
}
