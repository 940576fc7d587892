/// Errors from ri-core operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Stored project-part configuration could not be decoded.
    ///
    /// `category` names the offending text ("compiler arguments",
    /// "compiler macros", "include search paths").
    #[error("cannot parse {category}: {message}")]
    ArtefactParse {
        category: &'static str,
        message: String,
    },

    #[error("invalid ordinal {ordinal} for {type_name}")]
    InvalidOrdinal {
        type_name: &'static str,
        ordinal: u8,
    },

    #[error("type conversion failed: {reason}")]
    ConversionFailed { reason: String },
}

impl CoreError {
    pub fn is_retryable(&self) -> bool {
        false
    }
}
