//! Amazon SQS implementation of [`QueueService`].

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sqs::config::Region;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::{self, DeleteMessageBatchRequestEntry, MessageSystemAttributeName};
use aws_sdk_sqs::Client;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{QueueError, Result};
use crate::message::{DeleteEntry, Message, MessageBatch, MAX_BATCH_SIZE};
use crate::service::QueueService;

/// Where the queue lives and which credentials to use.
///
/// Unset fields fall back to the default AWS provider chain (environment,
/// shared config files, instance metadata).
#[derive(Debug, Clone, Default)]
pub struct SqsConfig {
    pub queue_url: String,
    pub region: Option<String>,
    pub profile: Option<String>,
    /// Alternate endpoint, e.g. a local SQS emulator
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SqsQueue {
    client: Client,
    queue_url: String,
}

impl SqsQueue {
    /// Resolve credentials and region, then build a client for the queue.
    pub async fn connect(config: &SqsConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &config.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let shared = loader.load().await;
        debug!(queue_url = %config.queue_url, region = ?shared.region(), "SQS client configured");
        Self::from_client(Client::new(&shared), config.queue_url.clone())
    }

    pub fn from_client(client: Client, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }

    /// Enqueue `body` and return the id the service assigned to it.
    pub async fn send(&self, body: &str) -> Result<String> {
        let output = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| QueueError::Send(DisplayErrorContext(&e).to_string()))?;

        Ok(output.message_id().unwrap_or_default().to_string())
    }
}

#[async_trait]
impl QueueService for SqsQueue {
    async fn receive(&self, max_messages: usize, wait: Duration) -> Result<MessageBatch> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages.clamp(1, MAX_BATCH_SIZE) as i32)
            .wait_time_seconds(wait.as_secs().min(20) as i32)
            .message_system_attribute_names(MessageSystemAttributeName::SentTimestamp)
            .message_attribute_names("All")
            .send()
            .await
            .map_err(|e| QueueError::Receive(DisplayErrorContext(&e).to_string()))?;

        Ok(output.messages().iter().filter_map(from_sqs).collect::<Vec<_>>().into())
    }

    async fn delete_batch(&self, entries: &[DeleteEntry]) -> Result<()> {
        let entries = entries
            .iter()
            .map(|entry| {
                DeleteMessageBatchRequestEntry::builder()
                    .id(&entry.id)
                    .receipt_handle(&entry.receipt_token)
                    .build()
                    .map_err(|e| QueueError::InvalidEntry(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let output = self
            .client
            .delete_message_batch()
            .queue_url(&self.queue_url)
            .set_entries(Some(entries))
            .send()
            .await
            .map_err(|e| QueueError::Delete(DisplayErrorContext(&e).to_string()))?;

        // Per-entry failures leave the message to be redelivered; the batch
        // itself still counts as acknowledged.
        for failed in output.failed() {
            warn!(
                id = failed.id(),
                code = failed.code(),
                message = failed.message().unwrap_or_default(),
                sender_fault = failed.sender_fault(),
                "message was not deleted"
            );
        }

        Ok(())
    }
}

/// Messages without an id or receipt handle cannot be acknowledged and are
/// skipped.
fn from_sqs(message: &types::Message) -> Option<Message> {
    let (Some(id), Some(receipt_token)) = (message.message_id(), message.receipt_handle()) else {
        warn!(id = ?message.message_id(), "skipping message without id or receipt handle");
        return None;
    };

    let received_at = message
        .attributes()
        .and_then(|attributes| attributes.get(&MessageSystemAttributeName::SentTimestamp))
        .and_then(|millis| millis.parse::<i64>().ok())
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_else(Utc::now);

    Some(Message {
        id: id.to_string(),
        receipt_token: receipt_token.to_string(),
        body: message.body().unwrap_or_default().to_string(),
        received_at,
    })
}
