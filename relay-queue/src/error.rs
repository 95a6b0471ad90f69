use thiserror::Error;

/// Failures talking to the queue service.
///
/// These are transport-level problems (network, credentials, throttling) and
/// are not retried inside the poller.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Receive failed: {0}")]
    Receive(String),

    #[error("Batch delete failed: {0}")]
    Delete(String),

    #[error("Send failed: {0}")]
    Send(String),

    /// A delete entry could not be built from a received message
    #[error("Invalid delete entry: {0}")]
    InvalidEntry(String),
}

pub type Result<T> = std::result::Result<T, QueueError>;
