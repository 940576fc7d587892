/// Query engine errors.
///
/// Matcher syntax errors are not errors at this level: they come back as
/// [`crate::diagnostics::DynamicMatcherDiagnostics`] next to an empty result.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("parser error: {0}")]
    Parser(#[from] ri_parser::error::ParserError),

    #[error("cannot parse {path}: {reason}")]
    ParseFailed { path: String, reason: String },

    #[error("no symbol at {line}:{column} in {path}")]
    NoSymbolAtCursor { path: String, line: u32, column: u32 },

    #[error("cannot build worker pool: {0}")]
    ThreadPool(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl QueryError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_io_is_retryable() {
        let io = QueryError::Io(std::io::Error::other("busy"));
        assert!(io.is_retryable());

        let cursor = QueryError::NoSymbolAtCursor {
            path: "/a.cpp".into(),
            line: 1,
            column: 1,
        };
        assert!(!cursor.is_retryable());
        assert_eq!(cursor.to_string(), "no symbol at 1:1 in /a.cpp");
    }
}
