use std::collections::HashMap;

use ri_core::{SymbolKind, SymbolTags};

use crate::callbacks::DeclId;
use crate::usr::ScopeKind;

#[derive(Debug, Clone)]
pub(crate) struct DeclInfo {
    pub usr: String,
    pub name: String,
    pub kind: SymbolKind,
    pub tags: SymbolTags,
    pub in_system_header: bool,
}

/// What a declaration is registered as.
pub(crate) struct NewDecl<'a> {
    pub usr: String,
    /// `::`-joined path used for name lookup, e.g. `ns::Foo::bar`.
    pub qualified_name: &'a str,
    pub name: &'a str,
    pub kind: SymbolKind,
    pub tags: SymbolTags,
    pub in_system_header: bool,
    pub is_member: bool,
}

/// Canonical declarations of one translation unit.
///
/// Declarations are interned by USR: every redeclaration of an entity maps
/// to the [`DeclId`] of its first declaration.
#[derive(Default)]
pub(crate) struct SymbolTable {
    decls: Vec<DeclInfo>,
    by_usr: HashMap<String, DeclId>,
    by_qualified_name: HashMap<String, Vec<DeclId>>,
    members_by_name: HashMap<String, Vec<DeclId>>,
    /// Namespaces, records and enums by qualified name. Namespaces have no
    /// declaration of their own.
    scopes: HashMap<String, (ScopeKind, Option<DeclId>)>,
}

impl SymbolTable {
    pub fn declare(&mut self, decl: NewDecl<'_>) -> DeclId {
        if let Some(&id) = self.by_usr.get(&decl.usr) {
            return id;
        }
        let id = DeclId(self.decls.len() as u32);
        self.by_usr.insert(decl.usr.clone(), id);
        self.by_qualified_name
            .entry(decl.qualified_name.to_string())
            .or_default()
            .push(id);
        if decl.is_member {
            self.members_by_name
                .entry(decl.name.to_string())
                .or_default()
                .push(id);
        }
        self.decls.push(DeclInfo {
            usr: decl.usr,
            name: decl.name.to_string(),
            kind: decl.kind,
            tags: decl.tags,
            in_system_header: decl.in_system_header,
        });
        id
    }

    /// Make a declaration also visible under another qualified name, as the
    /// enumerators of an unscoped enum are in the enclosing scope.
    pub fn alias(&mut self, qualified_name: &str, id: DeclId) {
        let ids = self.by_qualified_name.entry(qualified_name.to_string()).or_default();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    pub fn get(&self, id: DeclId) -> &DeclInfo {
        &self.decls[id.0 as usize]
    }

    pub fn register_scope(&mut self, qualified_name: &str, kind: ScopeKind, id: Option<DeclId>) {
        self.scopes
            .entry(qualified_name.to_string())
            .or_insert((kind, id));
    }

    pub fn scope_kind(&self, qualified_name: &str) -> Option<ScopeKind> {
        self.scopes.get(qualified_name).map(|(kind, _)| *kind)
    }

    /// Unqualified or partially qualified lookup of `name` from inside
    /// `enclosing` (outermost first), trying the innermost scope first.
    pub fn lookup(&self, enclosing: &[String], name: &str) -> Option<DeclId> {
        (0..=enclosing.len()).rev().find_map(|depth| {
            let key = qualify(&enclosing[..depth], name);
            self.by_qualified_name
                .get(&key)
                .and_then(|ids| ids.first().copied())
                .or_else(|| self.scopes.get(&key).and_then(|(_, id)| *id))
        })
    }

    /// Resolve the enclosing qualified name of a scope path like `a::B`
    /// written inside `enclosing`.
    pub fn resolve_scope(&self, enclosing: &[String], path: &[String]) -> Option<String> {
        let spelled = path.join("::");
        (0..=enclosing.len()).rev().find_map(|depth| {
            let key = qualify(&enclosing[..depth], &spelled);
            self.scopes.contains_key(&key).then_some(key)
        })
    }

    /// A member accessed through `.` or `->`. Only resolved when the name is
    /// unambiguous across all records seen so far.
    pub fn lookup_member(&self, name: &str) -> Option<DeclId> {
        match self.members_by_name.get(name).map(Vec::as_slice) {
            Some([only]) => Some(*only),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }
}

pub(crate) fn qualify(enclosing: &[String], name: &str) -> String {
    if enclosing.is_empty() {
        name.to_string()
    } else {
        format!("{}::{name}", enclosing.join("::"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl<'a>(usr: &str, qualified_name: &'a str, name: &'a str, is_member: bool) -> NewDecl<'a> {
        NewDecl {
            usr: usr.to_string(),
            qualified_name,
            name,
            kind: SymbolKind::Function,
            tags: SymbolTags::empty(),
            in_system_header: false,
            is_member,
        }
    }

    #[test]
    fn redeclaration_shares_id() {
        let mut table = SymbolTable::default();
        let a = table.declare(decl("c:@F@f#", "f", "f", false));
        let b = table.declare(decl("c:@F@f#", "f", "f", false));
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn lookup_prefers_innermost_scope() {
        let mut table = SymbolTable::default();
        let outer = table.declare(decl("c:@x", "x", "x", false));
        let inner = table.declare(decl("c:@N@ns@x", "ns::x", "x", false));
        let scope = vec!["ns".to_string()];
        assert_eq!(table.lookup(&scope, "x"), Some(inner));
        assert_eq!(table.lookup(&[], "x"), Some(outer));
        assert_eq!(table.lookup(&scope, "y"), None);
    }

    #[test]
    fn ambiguous_members_are_not_resolved() {
        let mut table = SymbolTable::default();
        let only = table.declare(decl("c:@S@A@FI@x", "A::x", "x", true));
        assert_eq!(table.lookup_member("x"), Some(only));
        table.declare(decl("c:@S@B@FI@x", "B::x", "x", true));
        assert_eq!(table.lookup_member("x"), None);
    }

    #[test]
    fn scope_resolution() {
        let mut table = SymbolTable::default();
        let id = table.declare(decl("c:@N@a@S@B", "a::B", "B", false));
        table.register_scope("a::B", ScopeKind::Struct, Some(id));
        let inside_a = vec!["a".to_string()];
        assert_eq!(table.resolve_scope(&inside_a, &["B".to_string()]).as_deref(), Some("a::B"));
        assert_eq!(table.resolve_scope(&[], &["a".to_string(), "B".to_string()]).as_deref(), Some("a::B"));
        assert_eq!(table.scope_kind("a::B"), Some(ScopeKind::Struct));
    }
}
