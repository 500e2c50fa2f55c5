use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("no address registered for node {0}")]
    NodeUnresolved(String),

    #[error("transport error talking to {node}: {message}")]
    Transport { node: String, message: String },

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),
}
