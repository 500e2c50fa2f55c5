use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Store(#[from] fmaster_store::StoreError),

    #[error(transparent)]
    Signal(#[from] fmaster_signal::SignalError),

    #[error(transparent)]
    Group(#[from] fmaster_group::GroupError),

    #[error(transparent)]
    Rgroup(#[from] fmaster_rgroup::RgroupError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("owner hand-over failed for group {group_id}: {message}")]
    OwnerHandOverFailed { group_id: String, message: String },
}
