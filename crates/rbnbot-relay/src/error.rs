use thiserror::Error;

/// Errors reported by a [`MessageSink`](crate::sink::MessageSink).
#[derive(Debug, Error)]
pub enum SinkError {
    /// The platform rejected or failed to deliver the message.
    #[error("send failed: {0}")]
    Send(String),

    /// The message could not be deleted (it may already be gone).
    #[error("delete failed: {0}")]
    Delete(String),
}

pub type Result<T> = std::result::Result<T, SinkError>;
