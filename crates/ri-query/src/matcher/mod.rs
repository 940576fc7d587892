//! The dynamic matcher language: `functionDecl(hasName("f")).bind("x")`.
//!
//! Expressions are parsed once per query and evaluated against every node
//! of a tree-sitter syntax tree.

mod evaluate;
mod lexer;
mod parser;
mod registry;

pub use evaluate::Evaluator;
pub use parser::parse_matcher_expression;
pub use registry::matcher_names;

use regex::Regex;

/// Node categories a node matcher selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Decl,
    FunctionDecl,
    RecordDecl,
    VarDecl,
    ParmVarDecl,
    FieldDecl,
    EnumDecl,
    EnumConstantDecl,
    NamespaceDecl,
    TypedefDecl,
    CallExpr,
    DeclRefExpr,
    MemberExpr,
    BinaryOperator,
    IfStmt,
    ForStmt,
    WhileStmt,
    ReturnStmt,
    CompoundStmt,
    StringLiteral,
    IntegerLiteral,
}

impl NodeKind {
    pub fn is_decl(self) -> bool {
        matches!(
            self,
            Self::Decl
                | Self::FunctionDecl
                | Self::RecordDecl
                | Self::VarDecl
                | Self::ParmVarDecl
                | Self::FieldDecl
                | Self::EnumDecl
                | Self::EnumConstantDecl
                | Self::NamespaceDecl
                | Self::TypedefDecl
        )
    }
}

/// A compiled matcher.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Selects nodes of `kind` that satisfy every inner matcher.
    Node {
        kind: NodeKind,
        inner: Vec<Matcher>,
        binding: Option<String>,
    },
    Anything,
    AllOf(Vec<Matcher>),
    AnyOf(Vec<Matcher>),
    Unless(Box<Matcher>),

    HasName(String),
    MatchesName(Regex),
    HasOperatorName(String),
    IsDefinition,
    IsExpansionInMainFile,
    ParameterCountIs(u32),
    ArgumentCountIs(u32),

    Has(Box<Matcher>),
    HasDescendant(Box<Matcher>),
    HasParent(Box<Matcher>),
    HasAncestor(Box<Matcher>),
    Callee(Box<Matcher>),
    HasBody(Box<Matcher>),
    HasCondition(Box<Matcher>),
    HasArgument(u32, Box<Matcher>),
}

impl Matcher {
    pub fn is_node_matcher(&self) -> bool {
        matches!(self, Self::Node { .. })
    }

    pub fn binding(&self) -> Option<&str> {
        match self {
            Self::Node { binding, .. } => binding.as_deref(),
            _ => None,
        }
    }
}

/// A parsed argument of a matcher call.
#[derive(Debug, Clone)]
pub(crate) enum Value {
    Matcher(Matcher),
    String(String),
    Unsigned(u32),
}

impl Value {
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Self::Matcher(_) => "Matcher",
            Self::String(_) => "String",
            Self::Unsigned(_) => "unsigned",
        }
    }
}
