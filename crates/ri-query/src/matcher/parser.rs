use ri_core::SourceRange;

use super::lexer::{Lexer, Token, TokenKind};
use super::registry;
use super::{Matcher, Value};
use crate::diagnostics::{ContextType, Diagnostics, DynamicMatcherDiagnostics, ErrorType};

/// Parse a matcher expression into a top-level node matcher.
///
/// The expression may be prefixed by the `match` (or `m`) command. On
/// failure the diagnostics describe the first error together with the
/// matcher constructs it was found in.
pub fn parse_matcher_expression(text: &str) -> Result<Matcher, DynamicMatcherDiagnostics> {
    let mut parser = Parser {
        lexer: Lexer::new(text),
        diagnostics: Diagnostics::default(),
    };
    match parser.parse_top_level() {
        Some(matcher) => Ok(matcher),
        None => Err(parser.diagnostics.into_errors()),
    }
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    diagnostics: Diagnostics,
}

impl Parser<'_> {
    fn parse_top_level(&mut self) -> Option<Matcher> {
        let mut first = self.lexer.next_token();
        if matches!(&first.kind, TokenKind::Ident(word) if word == "match" || word == "m")
            && !matches!(self.lexer.peek().kind, TokenKind::OpenParen)
        {
            first = self.lexer.next_token();
        }

        let (value, range) = self.parse_value(first)?;

        let trailing = self.lexer.next_token();
        if trailing.kind != TokenKind::Eof {
            self.error(ErrorType::ParserTrailingCode, trailing.range, vec![]);
            return None;
        }

        match value {
            Value::Matcher(matcher) if matcher.is_node_matcher() => Some(matcher),
            Value::Matcher(_) => {
                self.error(ErrorType::RegistryNonNodeMatcher, range, vec![]);
                None
            }
            _ => {
                self.error(ErrorType::ParserNotAMatcher, range, vec![]);
                None
            }
        }
    }

    fn parse_value(&mut self, token: Token) -> Option<(Value, SourceRange)> {
        match token.kind {
            TokenKind::String(text) => Some((Value::String(text), token.range)),
            TokenKind::Unsigned(value) => Some((Value::Unsigned(value), token.range)),
            TokenKind::Ident(name) => self.parse_matcher(name, token.range),
            TokenKind::BadString(text) => {
                self.error(ErrorType::ParserStringError, token.range, vec![text]);
                None
            }
            TokenKind::BadNumber(text) => {
                self.error(ErrorType::ParserNumberError, token.range, vec![text]);
                None
            }
            TokenKind::Eof => {
                self.error(ErrorType::ParserNoCode, token.range, vec![]);
                None
            }
            _ => {
                self.error(ErrorType::ParserInvalidToken, token.range, vec![token.text]);
                None
            }
        }
    }

    fn parse_matcher(&mut self, name: String, name_range: SourceRange) -> Option<(Value, SourceRange)> {
        let open = self.lexer.next_token();
        if open.kind != TokenKind::OpenParen {
            self.error(ErrorType::ParserNoOpenParen, open.range, vec![open.text]);
            return None;
        }

        let Some(descriptor) = registry::lookup(&name) else {
            self.error(ErrorType::RegistryMatcherNotFound, name_range, vec![name]);
            return None;
        };

        self.diagnostics.push_context(
            ContextType::MatcherConstruct,
            name_range,
            vec![descriptor.name().to_string()],
        );

        let mut arguments = Vec::new();
        let close = loop {
            let token = self.lexer.next_token();
            match token.kind {
                TokenKind::CloseParen => break token,
                TokenKind::Eof => {
                    self.error(ErrorType::ParserNoCloseParen, token.range, vec![]);
                    return None;
                }
                _ => {}
            }

            let token = if arguments.is_empty() {
                token
            } else if token.kind == TokenKind::Comma {
                self.lexer.next_token()
            } else {
                self.error(ErrorType::ParserNoComma, token.range, vec![token.text]);
                return None;
            };

            let index = arguments.len() + 1;
            self.diagnostics.push_context(
                ContextType::MatcherArg,
                token.range,
                vec![index.to_string(), descriptor.name().to_string()],
            );
            let argument = self.parse_value(token)?;
            self.diagnostics.pop_context();
            arguments.push(argument);
        };

        let range = SourceRange::new(name_range.start, close.range.end);
        let binding = self.parse_bind()?;

        let mut matcher = descriptor.construct(name_range, arguments, &mut self.diagnostics)?;
        if let Some(id) = binding {
            match &mut matcher {
                Matcher::Node { binding, .. } => *binding = Some(id),
                _ => {
                    self.error(ErrorType::RegistryNotBindable, range, vec![]);
                    return None;
                }
            }
        }
        self.diagnostics.pop_context();

        Some((Value::Matcher(matcher), range))
    }

    /// `.bind("id")` after a matcher call. `Some(None)` when absent.
    fn parse_bind(&mut self) -> Option<Option<String>> {
        if self.lexer.peek().kind != TokenKind::Period {
            return Some(None);
        }
        let period = self.lexer.next_token();

        let bind = self.lexer.next_token();
        let open = self.lexer.next_token();
        let id = self.lexer.next_token();
        let close = self.lexer.next_token();
        match (bind.kind, open.kind, id.kind, close.kind) {
            (TokenKind::Ident(word), TokenKind::OpenParen, TokenKind::String(id), TokenKind::CloseParen)
                if word == "bind" =>
            {
                Some(Some(id))
            }
            _ => {
                self.error(ErrorType::ParserMalformedBindExpr, period.range, vec![]);
                None
            }
        }
    }

    fn error(&mut self, error_type: ErrorType, range: SourceRange, arguments: Vec<String>) {
        self.diagnostics.add_error(error_type, range, arguments);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::NodeKind;

    fn first_error(text: &str) -> (ErrorType, Vec<String>) {
        let errors = parse_matcher_expression(text).unwrap_err();
        let message = &errors[0].message;
        (message.error_type, message.arguments.clone())
    }

    #[test]
    fn parses_nested_matchers_with_binding() {
        let matcher =
            parse_matcher_expression("functionDecl(hasName(\"f\"), parameterCountIs(1)).bind(\"fn\")")
                .unwrap();
        match &matcher {
            Matcher::Node { kind, inner, .. } => {
                assert_eq!(*kind, NodeKind::FunctionDecl);
                assert_eq!(inner.len(), 2);
            }
            other => panic!("unexpected matcher {other:?}"),
        }
        assert_eq!(matcher.binding(), Some("fn"));
    }

    #[test]
    fn accepts_the_match_command() {
        assert!(parse_matcher_expression("match recordDecl()").is_ok());
        assert!(parse_matcher_expression("m\n  varDecl()").is_ok());
    }

    #[test]
    fn unknown_matcher_reports_name_and_context() {
        let errors = parse_matcher_expression("functionDecl(hasNam(\"f\"))").unwrap_err();
        let error = &errors[0];
        assert_eq!(error.message.error_type, ErrorType::RegistryMatcherNotFound);
        assert_eq!(error.message.arguments, vec!["hasNam"]);
        assert_eq!(error.message.range.start.column, 14);
        assert_eq!(error.contexts.len(), 2);
        assert_eq!(error.contexts[0].context_type, ContextType::MatcherConstruct);
        assert_eq!(error.contexts[1].context_type, ContextType::MatcherArg);
        assert_eq!(error.contexts[1].arguments, vec!["1", "functionDecl"]);
    }

    #[test]
    fn syntax_errors() {
        assert_eq!(first_error("").0, ErrorType::ParserNoCode);
        assert_eq!(first_error("functionDecl").0, ErrorType::ParserNoOpenParen);
        assert_eq!(first_error("functionDecl(").0, ErrorType::ParserNoCloseParen);
        assert_eq!(
            first_error("functionDecl(isDefinition() isDefinition())"),
            (ErrorType::ParserNoComma, vec!["isDefinition".to_string()])
        );
        assert_eq!(first_error("functionDecl() x").0, ErrorType::ParserTrailingCode);
        assert_eq!(first_error("functionDecl().bind(x)").0, ErrorType::ParserMalformedBindExpr);
        assert_eq!(first_error("functionDecl(hasName(\"f))").0, ErrorType::ParserStringError);
        assert_eq!(first_error("functionDecl(,)").0, ErrorType::ParserInvalidToken);
    }

    #[test]
    fn type_errors() {
        assert_eq!(
            first_error("functionDecl(parameterCountIs(\"two\"))"),
            (
                ErrorType::RegistryWrongArgType,
                vec!["1".to_string(), "unsigned".to_string(), "String".to_string()]
            )
        );
        assert_eq!(
            first_error("functionDecl(isDefinition(1))"),
            (ErrorType::RegistryWrongArgCount, vec!["0".to_string(), "1".to_string()])
        );
        assert_eq!(first_error("\"f\"").0, ErrorType::ParserNotAMatcher);
        assert_eq!(first_error("hasName(\"f\")").0, ErrorType::RegistryNonNodeMatcher);
        assert_eq!(first_error("hasName(\"f\").bind(\"x\")").0, ErrorType::RegistryNotBindable);
        assert_eq!(first_error("recordDecl(matchesName(\"(\"))").0, ErrorType::ParserInvalidRegex);
    }
}
