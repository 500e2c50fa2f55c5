use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("metadata-store operation rejected: {0}")]
    EtcdOperationError(String),

    #[error("internal store error: {0}")]
    Internal(String),
}
