//! Receive / dispatch / acknowledge loop.
//!
//! Each cycle performs at most one receive and at most one batch delete.
//! Messages that are not deleted become visible again after the queue's
//! visibility timeout and are redelivered.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::message::{DeleteEntry, Message, MessageBatch, MAX_BATCH_SIZE};
use crate::policy::ProcessingPolicy;
use crate::service::QueueService;

/// Longest long-poll wait the queue service accepts.
pub const MAX_WAIT_TIME: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// Batch size requested per receive, 1..=10
    pub max_messages: usize,
    /// Long-poll wait per receive, 1 to 20 seconds
    pub wait_time: Duration,
    pub policy: ProcessingPolicy,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            max_messages: MAX_BATCH_SIZE,
            wait_time: MAX_WAIT_TIME,
            policy: ProcessingPolicy::default(),
        }
    }
}

/// Whether a handled message should be acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Handled,
    Unhandled,
}

/// Outcome of one receive/dispatch/delete cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    pub received: usize,
    pub dispatched: usize,
    pub deleted: usize,
}

/// Consumes messages on behalf of the poller.
#[async_trait]
pub trait MessageHandler: Send {
    async fn handle(&mut self, message: &Message) -> Disposition;
}

#[async_trait]
impl<F> MessageHandler for F
where
    F: FnMut(&Message) -> Disposition + Send,
{
    async fn handle(&mut self, message: &Message) -> Disposition {
        (self)(message)
    }
}

/// Pick the messages of `batch` to acknowledge, dispatching to `handler`
/// according to `policy`.
///
/// Under [`ProcessingPolicy::LatestOnly`] every message but the newest is
/// acknowledged without being handled, and the newest only if the handler
/// reports it handled. Under [`ProcessingPolicy::All`] exactly the handled
/// messages are acknowledged.
pub async fn select_deletions<H>(
    policy: ProcessingPolicy,
    batch: &MessageBatch,
    handler: &mut H,
) -> Vec<DeleteEntry>
where
    H: MessageHandler + ?Sized,
{
    match policy {
        ProcessingPolicy::LatestOnly => {
            let Some((latest, superseded)) = batch.split_last() else {
                return Vec::new();
            };

            let mut entries: Vec<DeleteEntry> = superseded.iter().map(Message::delete_entry).collect();
            if !superseded.is_empty() {
                debug!(count = superseded.len(), "dropping superseded messages");
            }
            if handler.handle(latest).await == Disposition::Handled {
                entries.push(latest.delete_entry());
            }
            entries
        }
        ProcessingPolicy::All => {
            let mut entries = Vec::with_capacity(batch.len());
            for message in batch {
                if handler.handle(message).await == Disposition::Handled {
                    entries.push(message.delete_entry());
                }
            }
            entries
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueuePoller {
    config: PollerConfig,
}

impl QueuePoller {
    pub fn new(config: PollerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// One receive, dispatch and delete cycle.
    ///
    /// Transport errors are returned as-is; nothing is retried here.
    pub async fn poll_once<Q, H>(&self, queue: &Q, handler: &mut H) -> Result<PollReport>
    where
        Q: QueueService + ?Sized,
        H: MessageHandler + ?Sized,
    {
        let batch = queue
            .receive(self.config.max_messages, self.config.wait_time)
            .await?;
        self.process_batch(queue, handler, batch).await
    }

    /// Dispatch an already received batch and acknowledge it with a single
    /// delete request. An empty batch is a no-op.
    pub async fn process_batch<Q, H>(&self, queue: &Q, handler: &mut H, batch: MessageBatch) -> Result<PollReport>
    where
        Q: QueueService + ?Sized,
        H: MessageHandler + ?Sized,
    {
        if batch.is_empty() {
            info!("no messages received");
            return Ok(PollReport::default());
        }

        let dispatched = match self.config.policy {
            ProcessingPolicy::LatestOnly => 1,
            ProcessingPolicy::All => batch.len(),
        };

        let entries = select_deletions(self.config.policy, &batch, handler).await;
        if !entries.is_empty() {
            queue.delete_batch(&entries).await?;
        }

        let report = PollReport {
            received: batch.len(),
            dispatched,
            deleted: entries.len(),
        };
        info!(
            received = report.received,
            dispatched = report.dispatched,
            deleted = report.deleted,
            policy = %self.config.policy,
            "batch processed"
        );
        Ok(report)
    }

    /// Non-empty batches from `queue`, in receive order.
    ///
    /// Empty receives are logged and polled again. A receive error is
    /// yielded once and then the stream ends.
    pub fn batches<'a, Q>(&'a self, queue: &'a Q) -> impl Stream<Item = Result<MessageBatch>> + Send + 'a
    where
        Q: QueueService + ?Sized,
    {
        stream::unfold(Some(queue), move |queue| async move {
            let Some(queue) = queue else {
                return None;
            };
            loop {
                match queue
                    .receive(self.config.max_messages, self.config.wait_time)
                    .await
                {
                    Ok(batch) if batch.is_empty() => info!("no messages received, polling again"),
                    Ok(batch) => return Some((Ok(batch), Some(queue))),
                    Err(e) => return Some((Err(e), None)),
                }
            }
        })
    }

    /// Poll until `cancel` fires or the queue fails.
    ///
    /// Cancellation is observed only while waiting for the next batch, so a
    /// batch that has been received is always fully dispatched and
    /// acknowledged before the loop stops.
    pub async fn run<Q, H>(&self, queue: &Q, handler: &mut H, cancel: &CancellationToken) -> Result<()>
    where
        Q: QueueService + ?Sized,
        H: MessageHandler + ?Sized,
    {
        info!(
            max_messages = self.config.max_messages,
            wait_secs = self.config.wait_time.as_secs(),
            policy = %self.config.policy,
            "queue poller started"
        );

        let batches = self.batches(queue);
        tokio::pin!(batches);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("queue poller stopped");
                    return Ok(());
                }
                next = batches.next() => next,
            };

            match next {
                Some(Ok(batch)) => {
                    self.process_batch(queue, handler, batch).await?;
                }
                Some(Err(e)) => {
                    error!(error = %e, "queue poller failed");
                    return Err(e);
                }
                None => return Ok(()),
            }
        }
    }
}
