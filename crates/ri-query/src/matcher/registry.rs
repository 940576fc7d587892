use regex::Regex;
use ri_core::SourceRange;

use super::{Matcher, NodeKind, Value};
use crate::diagnostics::{Diagnostics, ErrorType};

/// Argument shape of a registered matcher.
#[derive(Clone, Copy)]
enum Signature {
    /// Any number of inner matchers.
    Node(NodeKind),
    /// At least one matcher.
    Variadic(fn(Vec<Matcher>) -> Matcher),
    Nullary(fn() -> Matcher),
    Unary(fn(Box<Matcher>) -> Matcher),
    Text(fn(String) -> Matcher),
    Regex,
    Unsigned(fn(u32) -> Matcher),
    UnsignedThenMatcher(fn(u32, Box<Matcher>) -> Matcher),
}

const MATCHERS: &[(&str, Signature)] = &[
    ("decl", Signature::Node(NodeKind::Decl)),
    ("functionDecl", Signature::Node(NodeKind::FunctionDecl)),
    ("recordDecl", Signature::Node(NodeKind::RecordDecl)),
    ("cxxRecordDecl", Signature::Node(NodeKind::RecordDecl)),
    ("varDecl", Signature::Node(NodeKind::VarDecl)),
    ("parmVarDecl", Signature::Node(NodeKind::ParmVarDecl)),
    ("fieldDecl", Signature::Node(NodeKind::FieldDecl)),
    ("enumDecl", Signature::Node(NodeKind::EnumDecl)),
    ("enumConstantDecl", Signature::Node(NodeKind::EnumConstantDecl)),
    ("namespaceDecl", Signature::Node(NodeKind::NamespaceDecl)),
    ("typedefDecl", Signature::Node(NodeKind::TypedefDecl)),
    ("callExpr", Signature::Node(NodeKind::CallExpr)),
    ("declRefExpr", Signature::Node(NodeKind::DeclRefExpr)),
    ("memberExpr", Signature::Node(NodeKind::MemberExpr)),
    ("binaryOperator", Signature::Node(NodeKind::BinaryOperator)),
    ("ifStmt", Signature::Node(NodeKind::IfStmt)),
    ("forStmt", Signature::Node(NodeKind::ForStmt)),
    ("whileStmt", Signature::Node(NodeKind::WhileStmt)),
    ("returnStmt", Signature::Node(NodeKind::ReturnStmt)),
    ("compoundStmt", Signature::Node(NodeKind::CompoundStmt)),
    ("stringLiteral", Signature::Node(NodeKind::StringLiteral)),
    ("integerLiteral", Signature::Node(NodeKind::IntegerLiteral)),
    ("allOf", Signature::Variadic(Matcher::AllOf)),
    ("anyOf", Signature::Variadic(Matcher::AnyOf)),
    ("anything", Signature::Nullary(|| Matcher::Anything)),
    ("isDefinition", Signature::Nullary(|| Matcher::IsDefinition)),
    ("isExpansionInMainFile", Signature::Nullary(|| Matcher::IsExpansionInMainFile)),
    ("unless", Signature::Unary(Matcher::Unless)),
    ("has", Signature::Unary(Matcher::Has)),
    ("hasDescendant", Signature::Unary(Matcher::HasDescendant)),
    ("hasParent", Signature::Unary(Matcher::HasParent)),
    ("hasAncestor", Signature::Unary(Matcher::HasAncestor)),
    ("callee", Signature::Unary(Matcher::Callee)),
    ("hasBody", Signature::Unary(Matcher::HasBody)),
    ("hasCondition", Signature::Unary(Matcher::HasCondition)),
    ("hasName", Signature::Text(Matcher::HasName)),
    ("hasOperatorName", Signature::Text(Matcher::HasOperatorName)),
    ("matchesName", Signature::Regex),
    ("parameterCountIs", Signature::Unsigned(Matcher::ParameterCountIs)),
    ("argumentCountIs", Signature::Unsigned(Matcher::ArgumentCountIs)),
    ("hasArgument", Signature::UnsignedThenMatcher(Matcher::HasArgument)),
];

/// Every matcher name the registry knows, for completion and help output.
pub fn matcher_names() -> impl Iterator<Item = &'static str> {
    MATCHERS.iter().map(|(name, _)| *name)
}

pub(crate) struct MatcherDescriptor {
    name: &'static str,
    signature: Signature,
}

pub(crate) fn lookup(name: &str) -> Option<MatcherDescriptor> {
    MATCHERS
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|&(name, signature)| MatcherDescriptor { name, signature })
}

impl MatcherDescriptor {
    /// Build the matcher from parsed arguments, reporting count and type
    /// mismatches against `name_range`.
    pub(crate) fn construct(
        &self,
        name_range: SourceRange,
        arguments: Vec<(Value, SourceRange)>,
        diagnostics: &mut Diagnostics,
    ) -> Option<Matcher> {
        match self.signature {
            Signature::Node(kind) => {
                let inner = all_matchers(arguments, diagnostics)?;
                Some(Matcher::Node {
                    kind,
                    inner,
                    binding: None,
                })
            }
            Signature::Variadic(build) => {
                if arguments.is_empty() {
                    wrong_count(diagnostics, name_range, "1", 0);
                    return None;
                }
                Some(build(all_matchers(arguments, diagnostics)?))
            }
            Signature::Nullary(build) => {
                expect_count(diagnostics, name_range, &arguments, 0)?;
                Some(build())
            }
            Signature::Unary(build) => {
                let [argument] = exactly(diagnostics, name_range, arguments)?;
                Some(build(Box::new(matcher_arg(1, argument, diagnostics)?)))
            }
            Signature::Text(build) => {
                let [argument] = exactly(diagnostics, name_range, arguments)?;
                Some(build(string_arg(1, argument, diagnostics)?))
            }
            Signature::Regex => {
                let [argument] = exactly(diagnostics, name_range, arguments)?;
                let range = argument.1;
                let pattern = string_arg(1, argument, diagnostics)?;
                match Regex::new(&pattern) {
                    Ok(regex) => Some(Matcher::MatchesName(regex)),
                    Err(e) => {
                        diagnostics.add_error(
                            ErrorType::ParserInvalidRegex,
                            range,
                            vec![pattern, e.to_string()],
                        );
                        None
                    }
                }
            }
            Signature::Unsigned(build) => {
                let [argument] = exactly(diagnostics, name_range, arguments)?;
                Some(build(unsigned_arg(1, argument, diagnostics)?))
            }
            Signature::UnsignedThenMatcher(build) => {
                let [index, matcher] = exactly(diagnostics, name_range, arguments)?;
                let index = unsigned_arg(1, index, diagnostics)?;
                let matcher = matcher_arg(2, matcher, diagnostics)?;
                Some(build(index, Box::new(matcher)))
            }
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }
}

fn wrong_count(diagnostics: &mut Diagnostics, range: SourceRange, expected: &str, actual: usize) {
    diagnostics.add_error(
        ErrorType::RegistryWrongArgCount,
        range,
        vec![expected.to_string(), actual.to_string()],
    );
}

fn expect_count(
    diagnostics: &mut Diagnostics,
    range: SourceRange,
    arguments: &[(Value, SourceRange)],
    expected: usize,
) -> Option<()> {
    if arguments.len() == expected {
        Some(())
    } else {
        wrong_count(diagnostics, range, &expected.to_string(), arguments.len());
        None
    }
}

fn exactly<const N: usize>(
    diagnostics: &mut Diagnostics,
    range: SourceRange,
    arguments: Vec<(Value, SourceRange)>,
) -> Option<[(Value, SourceRange); N]> {
    expect_count(diagnostics, range, &arguments, N)?;
    arguments.try_into().ok()
}

fn wrong_type(diagnostics: &mut Diagnostics, index: usize, expected: &str, argument: &(Value, SourceRange)) {
    diagnostics.add_error(
        ErrorType::RegistryWrongArgType,
        argument.1,
        vec![
            index.to_string(),
            expected.to_string(),
            argument.0.type_name().to_string(),
        ],
    );
}

fn all_matchers(arguments: Vec<(Value, SourceRange)>, diagnostics: &mut Diagnostics) -> Option<Vec<Matcher>> {
    arguments
        .into_iter()
        .enumerate()
        .map(|(i, argument)| matcher_arg(i + 1, argument, diagnostics))
        .collect()
}

fn matcher_arg(index: usize, argument: (Value, SourceRange), diagnostics: &mut Diagnostics) -> Option<Matcher> {
    match argument.0 {
        Value::Matcher(matcher) => Some(matcher),
        _ => {
            wrong_type(diagnostics, index, "Matcher", &argument);
            None
        }
    }
}

fn string_arg(index: usize, argument: (Value, SourceRange), diagnostics: &mut Diagnostics) -> Option<String> {
    match argument.0 {
        Value::String(text) => Some(text),
        _ => {
            wrong_type(diagnostics, index, "String", &argument);
            None
        }
    }
}

fn unsigned_arg(index: usize, argument: (Value, SourceRange), diagnostics: &mut Diagnostics) -> Option<u32> {
    match argument.0 {
        Value::Unsigned(value) => Some(value),
        _ => {
            wrong_type(diagnostics, index, "unsigned", &argument);
            None
        }
    }
}
