use async_trait::async_trait;

use rbnbot_core::{MessageHandle, RichMessage};

use crate::error::Result;

/// Messaging platform the relay publishes to.
///
/// Implementations bound their own latency; the relay never applies a timeout.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Send a single rich display unit (title, colour, one inline field).
    async fn send_rich(&self, message: &RichMessage) -> Result<MessageHandle>;

    /// Send plain text.
    async fn send_text(&self, body: &str) -> Result<MessageHandle>;

    /// Delete a previously sent message. Deleting an already-gone message
    /// may fail; callers treat that as non-fatal.
    async fn delete(&self, handle: &MessageHandle) -> Result<()>;
}
