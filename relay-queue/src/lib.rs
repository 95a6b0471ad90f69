//! # Relay Queue
//!
//! Long-poll consumer for a command queue.
//!
//! A [`QueuePoller`] repeatedly receives a batch from a [`QueueService`],
//! passes messages to a [`MessageHandler`] according to its
//! [`ProcessingPolicy`], and acknowledges the batch with a single delete.
//! [`SqsQueue`] is the Amazon SQS implementation.
//!
//! ```rust,no_run
//! use relay_queue::{Disposition, Message, PollerConfig, QueuePoller, SqsConfig, SqsQueue};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> relay_queue::Result<()> {
//! let queue = SqsQueue::connect(&SqsConfig {
//!     queue_url: "https://sqs.us-east-1.amazonaws.com/123456789012/playback".to_string(),
//!     ..SqsConfig::default()
//! })
//! .await;
//!
//! let mut handler = |message: &Message| {
//!     println!("{}", message.body);
//!     Disposition::Handled
//! };
//!
//! QueuePoller::new(PollerConfig::default())
//!     .run(&queue, &mut handler, &CancellationToken::new())
//!     .await
//! # }
//! ```

mod error;
mod message;
mod poller;
mod policy;
mod service;
mod sqs;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use error::{QueueError, Result};
pub use message::{DeleteEntry, Message, MessageBatch, MAX_BATCH_SIZE};
pub use poller::{
    select_deletions, Disposition, MessageHandler, PollReport, PollerConfig, QueuePoller, MAX_WAIT_TIME,
};
pub use policy::{ParsePolicyError, ProcessingPolicy};
pub use service::QueueService;
pub use sqs::{SqsConfig, SqsQueue};
