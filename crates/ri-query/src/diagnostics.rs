use ri_core::SourceRange;
use serde::{Deserialize, Serialize};

/// Kinds of matcher-expression errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    RegistryMatcherNotFound,
    RegistryWrongArgCount,
    RegistryWrongArgType,
    RegistryNotBindable,
    RegistryValueNotFound,
    RegistryNonNodeMatcher,
    ParserStringError,
    ParserNoOpenParen,
    ParserNoCloseParen,
    ParserNoComma,
    ParserNoCode,
    ParserNotAMatcher,
    ParserInvalidToken,
    ParserMalformedBindExpr,
    ParserTrailingCode,
    ParserNumberError,
    ParserInvalidRegex,
}

impl ErrorType {
    /// Message template; `$0`, `$1`, ... are replaced by the arguments.
    pub fn template(self) -> &'static str {
        match self {
            Self::RegistryMatcherNotFound => "Matcher not found: $0",
            Self::RegistryWrongArgCount => "Incorrect argument count. (Expected = $0) != (Actual = $1)",
            Self::RegistryWrongArgType => "Incorrect type for arg $0. (Expected = $1) != (Actual = $2)",
            Self::RegistryNotBindable => "Matcher does not support binding.",
            Self::RegistryValueNotFound => "Value not found: $0",
            Self::RegistryNonNodeMatcher => "Matcher not a node matcher: $0",
            Self::ParserStringError => "Error parsing string token: <$0>",
            Self::ParserNoOpenParen => "Error parsing matcher. Found token <$0> while looking for '('.",
            Self::ParserNoCloseParen => "Error parsing matcher. Found end-of-code while looking for ')'.",
            Self::ParserNoComma => "Error parsing arguments. Found token <$0> while looking for ','.",
            Self::ParserNoCode => "End of code found while looking for token.",
            Self::ParserNotAMatcher => "Input value is not a matcher expression.",
            Self::ParserInvalidToken => "Invalid token <$0> found when looking for a value.",
            Self::ParserMalformedBindExpr => "Malformed bind() expression.",
            Self::ParserTrailingCode => "Expected end of code.",
            Self::ParserNumberError => "Error parsing numeric literal: <$0>",
            Self::ParserInvalidRegex => "Invalid regular expression <$0>: $1",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextType {
    MatcherConstruct,
    MatcherArg,
}

impl ContextType {
    pub fn template(self) -> &'static str {
        match self {
            Self::MatcherConstruct => "Error building matcher $0.",
            Self::MatcherArg => "Error parsing argument $0 for matcher $1.",
        }
    }
}

/// The error itself, located in the matcher text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticMessage {
    pub error_type: ErrorType,
    pub range: SourceRange,
    pub arguments: Vec<String>,
}

impl DiagnosticMessage {
    pub fn text(&self) -> String {
        format_template(self.error_type.template(), &self.arguments)
    }
}

/// One enclosing construct the error happened in, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticContext {
    pub context_type: ContextType,
    pub range: SourceRange,
    pub arguments: Vec<String>,
}

impl DiagnosticContext {
    pub fn text(&self) -> String {
        format_template(self.context_type.template(), &self.arguments)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicMatcherDiagnostic {
    pub message: DiagnosticMessage,
    pub contexts: Vec<DiagnosticContext>,
}

impl DynamicMatcherDiagnostic {
    /// Human-readable rendering, contexts first, in the form
    /// `line:column: message`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for context in &self.contexts {
            out.push_str(&format!(
                "{}:{}: {}\n",
                context.range.start.line,
                context.range.start.column,
                context.text()
            ));
        }
        out.push_str(&format!(
            "{}:{}: {}",
            self.message.range.start.line,
            self.message.range.start.column,
            self.message.text()
        ));
        out
    }
}

pub type DynamicMatcherDiagnostics = Vec<DynamicMatcherDiagnostic>;

fn format_template(template: &str, arguments: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '$' {
            if let Some(index) = chars.peek().and_then(|d| d.to_digit(10)) {
                chars.next();
                if let Some(argument) = arguments.get(index as usize) {
                    out.push_str(argument);
                }
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Collects the context stack while a matcher expression is parsed and
/// turns the first error into a [`DynamicMatcherDiagnostic`].
#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    contexts: Vec<DiagnosticContext>,
    errors: DynamicMatcherDiagnostics,
}

impl Diagnostics {
    pub(crate) fn push_context(
        &mut self,
        context_type: ContextType,
        range: SourceRange,
        arguments: Vec<String>,
    ) {
        self.contexts.push(DiagnosticContext {
            context_type,
            range,
            arguments,
        });
    }

    pub(crate) fn pop_context(&mut self) {
        self.contexts.pop();
    }

    pub(crate) fn add_error(&mut self, error_type: ErrorType, range: SourceRange, arguments: Vec<String>) {
        self.errors.push(DynamicMatcherDiagnostic {
            message: DiagnosticMessage {
                error_type,
                range,
                arguments,
            },
            contexts: self.contexts.clone(),
        });
    }

    pub(crate) fn into_errors(self) -> DynamicMatcherDiagnostics {
        self.errors
    }
}

#[cfg(test)]
mod tests {
    use ri_core::SourceLocation;

    use super::*;

    #[test]
    fn templates_are_filled_in_order() {
        let message = DiagnosticMessage {
            error_type: ErrorType::RegistryWrongArgCount,
            range: SourceRange::default(),
            arguments: vec!["1".into(), "2".into()],
        };
        assert_eq!(
            message.text(),
            "Incorrect argument count. (Expected = 1) != (Actual = 2)"
        );
    }

    #[test]
    fn missing_arguments_render_empty() {
        assert_eq!(format_template("Matcher not found: $0", &[]), "Matcher not found: ");
    }

    #[test]
    fn errors_capture_the_context_stack() {
        let at = |column| SourceRange::new(SourceLocation::new(1, column, column - 1), SourceLocation::new(1, column, column - 1));
        let mut diagnostics = Diagnostics::default();
        diagnostics.push_context(ContextType::MatcherConstruct, at(1), vec!["functionDecl".into()]);
        diagnostics.push_context(ContextType::MatcherArg, at(14), vec!["1".into(), "functionDecl".into()]);
        diagnostics.add_error(ErrorType::RegistryMatcherNotFound, at(14), vec!["hasNam".into()]);
        diagnostics.pop_context();
        diagnostics.pop_context();

        let errors = diagnostics.into_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].contexts.len(), 2);
        assert_eq!(
            errors[0].render(),
            "1:1: Error building matcher functionDecl.\n\
             1:14: Error parsing argument 1 for matcher functionDecl.\n\
             1:14: Matcher not found: hasNam"
        );
    }
}
