/// Indexer errors.
#[derive(Debug, thiserror::Error)]
pub enum IndexerError {
    #[error("parser error: {0}")]
    Parser(#[from] ri_parser::error::ParserError),

    #[error("storage error: {0}")]
    Storage(#[from] ri_storage::error::StorageError),

    #[error("invalid project part: {0}")]
    Core(#[from] ri_core::CoreError),

    #[error("cannot build worker pool: {0}")]
    ThreadPool(String),

    #[error("watcher error: {0}")]
    Watcher(String),

    #[error("pipeline failed at stage '{stage}': {reason}")]
    PipelineFailed { stage: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexerError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Storage(e) => e.is_retryable(),
            _ => false,
        }
    }

    pub(crate) fn lock_poisoned(stage: &str) -> Self {
        Self::PipelineFailed {
            stage: stage.to_string(),
            reason: "lock poisoned".to_string(),
        }
    }
}
