use thiserror::Error;

#[derive(Debug, Error)]
pub enum RgroupError {
    #[error("resource group not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] fmaster_store::StoreError),

    #[error(transparent)]
    Signal(#[from] fmaster_signal::SignalError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("scheduler could not place bundles for {0}")]
    PlacementFailed(String),
}
