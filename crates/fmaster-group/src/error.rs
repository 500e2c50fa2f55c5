use thiserror::Error;

#[derive(Debug, Error)]
pub enum GroupError {
    #[error("group not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] fmaster_store::StoreError),

    #[error(transparent)]
    Signal(#[from] fmaster_signal::SignalError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
