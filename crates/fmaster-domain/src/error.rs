use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid instance id: {0}")]
    InvalidInstanceId(String),

    #[error("invalid group id: {0}")]
    InvalidGroupId(String),

    #[error("invalid state transition for instance {instance_id}: {from:?} -> {to:?}")]
    InvalidStateTransition {
        instance_id: String,
        from: String,
        to: String,
    },

    #[error("malformed create option '{key}' on instance {instance_id}: {message}")]
    InvalidCreateOption {
        instance_id: String,
        key: String,
        message: String,
    },

    #[error("invalid request id format: {0}")]
    InvalidRequestId(String),
}
