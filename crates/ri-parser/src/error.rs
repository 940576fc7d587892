/// Front-end errors.
///
/// Only failures on the main file of a translation unit surface as errors;
/// problems in included files become diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    #[error("file too large ({size} bytes, max {max}): {path}")]
    FileTooLarge { path: String, size: u64, max: u64 },

    #[error("invalid encoding (non-UTF-8): {path}")]
    InvalidEncoding { path: String },

    #[error("parse failed for {path}: {reason}")]
    ParseFailed { path: String, reason: String },

    #[error("include depth limit ({depth}) exceeded at {path}")]
    IncludeDepthExceeded { path: String, depth: usize },

    #[error("invalid compiler arguments: {reason}")]
    InvalidArguments { reason: String },

    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ParserError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}
