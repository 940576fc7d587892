//! Unified Symbol Resolution strings.
//!
//! The layout follows the clang index convention so that USRs produced here
//! stay comparable with ones produced by other C/C++ indexers:
//! `c:@N@ns@S@Class@F@method#int#` for a method, `c:@FI@field` for a field
//! segment, `c:file.h@123@macro@NAME` for a macro defined at byte 123.

use std::path::Path;

/// Kind of a scope segment inside a USR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ScopeKind {
    Namespace,
    AnonymousNamespace,
    Struct,
    Union,
    Enum,
}

impl ScopeKind {
    fn marker(self) -> &'static str {
        match self {
            Self::Namespace => "@N@",
            Self::AnonymousNamespace => "@aN",
            Self::Struct => "@S@",
            Self::Union => "@U@",
            Self::Enum => "@E@",
        }
    }
}

/// Kind of the final segment of a USR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LeafKind<'a> {
    Record(ScopeKind),
    Function { signature: &'a str },
    Field,
    Variable,
    Typedef,
    Enumerator,
}

pub(crate) fn scope_prefix<'a>(scopes: impl IntoIterator<Item = (ScopeKind, &'a str)>) -> String {
    let mut prefix = String::from("c:");
    for (kind, name) in scopes {
        prefix.push_str(kind.marker());
        if kind != ScopeKind::AnonymousNamespace {
            prefix.push_str(name);
        }
    }
    prefix
}

pub(crate) fn declaration_usr(prefix: &str, leaf: LeafKind<'_>, name: &str) -> String {
    match leaf {
        LeafKind::Record(kind) => format!("{prefix}{}{name}", kind.marker()),
        LeafKind::Function { signature } => format!("{prefix}@F@{name}#{signature}"),
        LeafKind::Field => format!("{prefix}@FI@{name}"),
        LeafKind::Typedef => format!("{prefix}@T@{name}"),
        LeafKind::Variable | LeafKind::Enumerator => format!("{prefix}@{name}"),
    }
}

pub(crate) fn macro_usr(file_path: &str, offset: u32, name: &str) -> String {
    let file_name = Path::new(file_path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file_path);
    format!("c:{file_name}@{offset}@macro@{name}")
}

pub(crate) fn command_line_macro_usr(name: &str) -> String {
    format!("c:@macro@{name}")
}

/// Encode parameter type spellings as a signature: each type followed by
/// `#`, whitespace collapsed.
pub(crate) fn signature<'a>(parameter_types: impl IntoIterator<Item = &'a str>) -> String {
    let mut signature = String::new();
    for ty in parameter_types {
        let collapsed: Vec<&str> = ty.split_whitespace().collect();
        signature.push_str(&collapsed.join(" "));
        signature.push('#');
    }
    signature
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_method_usr() {
        let prefix = scope_prefix([(ScopeKind::Namespace, "ns"), (ScopeKind::Struct, "Foo")]);
        let sig = signature(["int", "const char  *"]);
        assert_eq!(
            declaration_usr(&prefix, LeafKind::Function { signature: &sig }, "bar"),
            "c:@N@ns@S@Foo@F@bar#int#const char *#"
        );
    }

    #[test]
    fn anonymous_namespace_has_no_name() {
        let prefix = scope_prefix([(ScopeKind::AnonymousNamespace, "")]);
        assert_eq!(declaration_usr(&prefix, LeafKind::Variable, "x"), "c:@aN@x");
    }

    #[test]
    fn field_and_typedef() {
        let prefix = scope_prefix([(ScopeKind::Struct, "P")]);
        assert_eq!(declaration_usr(&prefix, LeafKind::Field, "x"), "c:@S@P@FI@x");
        assert_eq!(declaration_usr("c:", LeafKind::Typedef, "T"), "c:@T@T");
    }

    #[test]
    fn macro_usrs() {
        assert_eq!(macro_usr("/src/defs.h", 42, "MAX"), "c:defs.h@42@macro@MAX");
        assert_eq!(command_line_macro_usr("NDEBUG"), "c:@macro@NDEBUG");
    }
}
