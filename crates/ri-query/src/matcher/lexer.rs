use ri_core::{SourceLocation, SourceRange};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Ident(String),
    /// Unescaped contents of a double-quoted literal.
    String(String),
    Unsigned(u32),
    OpenParen,
    CloseParen,
    Comma,
    Period,
    Eof,
    /// Unterminated string literal.
    BadString(String),
    /// Digits that do not fit an unsigned value.
    BadNumber(String),
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) text: String,
    pub(crate) range: SourceRange,
}

/// Splits a matcher expression into tokens. `#` starts a comment that runs
/// to the end of the line.
pub(crate) struct Lexer<'a> {
    text: &'a str,
    pos: usize,
    line: u32,
    line_start: usize,
    peeked: Option<Token>,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            line: 1,
            line_start: 0,
            peeked: None,
        }
    }

    pub(crate) fn peek(&mut self) -> &Token {
        // next_token consumes an existing peek, so this is idempotent.
        let token = self.next_token();
        self.peeked.insert(token)
    }

    pub(crate) fn next_token(&mut self) -> Token {
        match self.peeked.take() {
            Some(token) => token,
            None => self.lex(),
        }
    }

    /// Range of the position the lexer currently stands on, for errors
    /// reported at end of input.
    pub(crate) fn here(&self) -> SourceRange {
        let location = self.location();
        SourceRange::new(location, location)
    }

    fn location(&self) -> SourceLocation {
        SourceLocation::new(
            self.line,
            (self.pos - self.line_start + 1) as u32,
            self.pos as u32,
        )
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn bump(&mut self, len: usize) {
        for (i, b) in self.text.as_bytes()[self.pos..self.pos + len].iter().enumerate() {
            if *b == b'\n' {
                self.line += 1;
                self.line_start = self.pos + i + 1;
            }
        }
        self.pos += len;
    }

    fn skip_trivia(&mut self) {
        loop {
            let rest = self.rest();
            let whitespace = rest.len() - rest.trim_start().len();
            if whitespace > 0 {
                self.bump(whitespace);
                continue;
            }
            if rest.starts_with('#') {
                let len = rest.find('\n').unwrap_or(rest.len());
                self.bump(len);
                continue;
            }
            break;
        }
    }

    fn lex(&mut self) -> Token {
        self.skip_trivia();
        let start = self.location();
        let rest = self.rest();

        let (kind, len) = match rest.chars().next() {
            None => (TokenKind::Eof, 0),
            Some('(') => (TokenKind::OpenParen, 1),
            Some(')') => (TokenKind::CloseParen, 1),
            Some(',') => (TokenKind::Comma, 1),
            Some('.') => (TokenKind::Period, 1),
            Some('"') => lex_string(rest),
            Some(c) if c.is_ascii_digit() => {
                let len = rest
                    .find(|c: char| !c.is_ascii_alphanumeric())
                    .unwrap_or(rest.len());
                let digits = &rest[..len];
                match digits.parse::<u32>() {
                    Ok(value) => (TokenKind::Unsigned(value), len),
                    Err(_) => (TokenKind::BadNumber(digits.to_string()), len),
                }
            }
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let len = rest
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(rest.len());
                (TokenKind::Ident(rest[..len].to_string()), len)
            }
            Some(c) => (TokenKind::Invalid(c.to_string()), c.len_utf8()),
        };

        let text = rest[..len].to_string();
        self.bump(len);
        Token {
            kind,
            text,
            range: SourceRange::new(start, self.location()),
        }
    }
}

fn lex_string(rest: &str) -> (TokenKind, usize) {
    let mut value = String::new();
    let mut chars = rest.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return (TokenKind::String(value), i + 1),
            '\\' => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, escaped)) => value.push(escaped),
                None => break,
            },
            '\n' => return (TokenKind::BadString(rest[..i].to_string()), i),
            _ => value.push(c),
        }
    }
    (TokenKind::BadString(rest.to_string()), rest.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(text);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token();
            let done = token.kind == TokenKind::Eof;
            out.push(token.kind);
            if done {
                return out;
            }
        }
    }

    #[test]
    fn lexes_a_matcher() {
        assert_eq!(
            kinds("functionDecl(hasName(\"f\"), parameterCountIs(2)).bind(\"x\")"),
            vec![
                TokenKind::Ident("functionDecl".into()),
                TokenKind::OpenParen,
                TokenKind::Ident("hasName".into()),
                TokenKind::OpenParen,
                TokenKind::String("f".into()),
                TokenKind::CloseParen,
                TokenKind::Comma,
                TokenKind::Ident("parameterCountIs".into()),
                TokenKind::OpenParen,
                TokenKind::Unsigned(2),
                TokenKind::CloseParen,
                TokenKind::CloseParen,
                TokenKind::Period,
                TokenKind::Ident("bind".into()),
                TokenKind::OpenParen,
                TokenKind::String("x".into()),
                TokenKind::CloseParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comments_and_newlines_are_skipped() {
        let mut lexer = Lexer::new("# find functions\n  functionDecl()");
        let token = lexer.next_token();
        assert_eq!(token.kind, TokenKind::Ident("functionDecl".into()));
        assert_eq!(token.range.start, SourceLocation::new(2, 3, 19));
        assert_eq!(token.range.end.column, 15);
    }

    #[test]
    fn bad_literals() {
        assert_eq!(kinds("\"open")[0], TokenKind::BadString("\"open".into()));
        assert_eq!(kinds("99999999999")[0], TokenKind::BadNumber("99999999999".into()));
        assert_eq!(kinds("12ab")[0], TokenKind::BadNumber("12ab".into()));
        assert_eq!(kinds("@")[0], TokenKind::Invalid("@".into()));
    }

    #[test]
    fn escaped_quotes() {
        assert_eq!(kinds(r#""a\"b""#)[0], TokenKind::String("a\"b".into()));
    }
}
