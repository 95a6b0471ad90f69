//! Scripted in-memory queue for exercising a [`QueuePoller`](crate::QueuePoller)
//! without AWS.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{QueueError, Result};
use crate::message::{DeleteEntry, Message, MessageBatch};
use crate::service::QueueService;

#[derive(Debug, Default)]
struct QueueState {
    script: VecDeque<Result<MessageBatch>>,
    deletions: Vec<Vec<DeleteEntry>>,
    receives: Vec<(usize, Duration)>,
    cancel_when_drained: Option<CancellationToken>,
    fail_deletes: bool,
}

/// Replays scripted receive results in order and records every delete.
///
/// Once the script is exhausted a receive either cancels the registered
/// token and waits forever, or fails if no token was registered.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueue {
    state: Arc<Mutex<QueueState>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_batch(&self, messages: Vec<Message>) {
        self.with_state(|state| state.script.push_back(Ok(messages.into())));
    }

    pub fn push_error(&self, error: QueueError) {
        self.with_state(|state| state.script.push_back(Err(error)));
    }

    pub fn cancel_when_drained(&self, token: CancellationToken) {
        self.with_state(|state| state.cancel_when_drained = Some(token));
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.with_state(|state| state.fail_deletes = fail);
    }

    /// Every delete request, in order.
    pub fn deletions(&self) -> Vec<Vec<DeleteEntry>> {
        self.with_state(|state| state.deletions.clone())
    }

    pub fn deleted_ids(&self) -> Vec<String> {
        self.with_state(|state| {
            state
                .deletions
                .iter()
                .flatten()
                .map(|entry| entry.id.clone())
                .collect()
        })
    }

    /// `(max_messages, wait)` of every receive call.
    pub fn receives(&self) -> Vec<(usize, Duration)> {
        self.with_state(|state| state.receives.clone())
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut QueueState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut state)
    }
}

#[async_trait]
impl QueueService for MemoryQueue {
    async fn receive(&self, max_messages: usize, wait: Duration) -> Result<MessageBatch> {
        let (next, token) = self.with_state(|state| {
            state.receives.push((max_messages, wait));
            (state.script.pop_front(), state.cancel_when_drained.clone())
        });

        match (next, token) {
            (Some(result), _) => result,
            (None, Some(token)) => {
                token.cancel();
                std::future::pending().await
            }
            (None, None) => Err(QueueError::Receive("memory queue drained".to_string())),
        }
    }

    async fn delete_batch(&self, entries: &[DeleteEntry]) -> Result<()> {
        self.with_state(|state| {
            if state.fail_deletes {
                return Err(QueueError::Delete("injected delete failure".to_string()));
            }
            state.deletions.push(entries.to_vec());
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poller::{Disposition, PollerConfig, QueuePoller};
    use crate::policy::ProcessingPolicy;

    fn message(id: &str, body: &str) -> Message {
        Message::new(id, format!("receipt-{}", id), body)
    }

    #[tokio::test]
    async fn run_processes_every_scripted_batch_then_stops_on_cancel() {
        let queue = MemoryQueue::new();
        queue.push_batch(vec![message("1", "PAUSE"), message("2", "RESUME")]);
        queue.push_batch(Vec::new());
        queue.push_batch(vec![message("3", "PAUSE")]);

        let cancel = CancellationToken::new();
        queue.cancel_when_drained(cancel.clone());

        let mut handled = Vec::new();
        let mut handler = |message: &Message| {
            handled.push(message.id.clone());
            Disposition::Handled
        };

        QueuePoller::new(PollerConfig::default())
            .run(&queue, &mut handler, &cancel)
            .await
            .unwrap();

        assert_eq!(handled, vec!["2".to_string(), "3".to_string()]);
        assert_eq!(queue.deletions().len(), 2);
        assert_eq!(queue.deleted_ids(), vec!["1", "2", "3"]);
        assert_eq!(queue.receives().len(), 4);
        assert!(queue
            .receives()
            .iter()
            .all(|(max, wait)| *max == 10 && *wait == Duration::from_secs(20)));
    }

    #[tokio::test]
    async fn unhandled_messages_stay_on_the_queue() {
        let queue = MemoryQueue::new();
        queue.push_batch(vec![message("1", "PAUSE"), message("2", "RESUME"), message("3", "PAUSE")]);

        let poller = QueuePoller::new(PollerConfig {
            policy: ProcessingPolicy::All,
            ..PollerConfig::default()
        });
        let mut handler = |message: &Message| {
            if message.body == "PAUSE" {
                Disposition::Handled
            } else {
                Disposition::Unhandled
            }
        };

        let report = poller.poll_once(&queue, &mut handler).await.unwrap();

        assert_eq!(report.dispatched, 3);
        assert_eq!(queue.deleted_ids(), vec!["1", "3"]);
    }

    #[tokio::test]
    async fn run_surfaces_delete_failures() {
        let queue = MemoryQueue::new();
        queue.push_batch(vec![message("1", "PAUSE")]);
        queue.fail_deletes(true);

        let mut handler = |_: &Message| Disposition::Handled;
        let err = QueuePoller::default()
            .run(&queue, &mut handler, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, QueueError::Delete(_)));
        assert!(queue.deletions().is_empty());
    }

    #[tokio::test]
    async fn drained_queue_without_token_fails() {
        let queue = MemoryQueue::new();
        let mut handler = |_: &Message| Disposition::Handled;
        let err = QueuePoller::default()
            .run(&queue, &mut handler, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::Receive(_)));
    }
}
