use chrono::{DateTime, Utc};

/// Largest batch one receive call may return.
pub const MAX_BATCH_SIZE: usize = 10;

/// One delivery of a queued command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    /// Per-delivery token required to acknowledge this delivery
    pub receipt_token: String,
    pub body: String,
    pub received_at: DateTime<Utc>,
}

impl Message {
    pub fn new(id: impl Into<String>, receipt_token: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            receipt_token: receipt_token.into(),
            body: body.into(),
            received_at: Utc::now(),
        }
    }

    pub fn delete_entry(&self) -> DeleteEntry {
        DeleteEntry {
            id: self.id.clone(),
            receipt_token: self.receipt_token.clone(),
        }
    }
}

/// Identifies one delivery to acknowledge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteEntry {
    pub id: String,
    pub receipt_token: String,
}

/// Messages returned by one receive call, in delivery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageBatch {
    messages: Vec<Message>,
}

impl MessageBatch {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// The newest message and the ones it supersedes.
    pub fn split_last(&self) -> Option<(&Message, &[Message])> {
        self.messages.split_last()
    }
}

impl From<Vec<Message>> for MessageBatch {
    fn from(messages: Vec<Message>) -> Self {
        Self::new(messages)
    }
}

impl<'a> IntoIterator for &'a MessageBatch {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
