use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::message::{DeleteEntry, MessageBatch};

/// The consumed side of a long-poll queue.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueueService: Send + Sync {
    /// Wait up to `wait` for at most `max_messages` messages. Returns an
    /// empty batch when the wait window closes with nothing available.
    async fn receive(&self, max_messages: usize, wait: Duration) -> Result<MessageBatch>;

    /// Acknowledge every entry in one request.
    async fn delete_batch(&self, entries: &[DeleteEntry]) -> Result<()>;
}
