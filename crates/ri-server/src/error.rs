/// Server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("indexer error: {0}")]
    Indexer(#[from] ri_indexer::IndexerError),

    #[error("storage error: {0}")]
    Storage(#[from] ri_storage::StorageError),

    #[error("query error: {0}")]
    Query(#[from] ri_query::QueryError),

    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Indexer(e) => e.is_retryable(),
            Self::Storage(e) => e.is_retryable(),
            Self::Query(e) => e.is_retryable(),
            _ => false,
        }
    }
}
