// Message queue trait: receive one message, acknowledge it by token.
//
// Implementors: SqsQueue (aws-sdk-sqs). Tests substitute an in-memory queue.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

/// One delivery of a queue message.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueMessage {
    pub message_id: String,
    pub body: String,
    /// Receipt handle: required to delete this specific delivery.
    pub ack_token: String,
    /// How many times the queue has handed this message out, if reported.
    pub receive_count: Option<u32>,
}

#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Wait up to `wait` for at most one message. `Ok(None)` means the
    /// long-poll window closed with nothing to deliver.
    async fn receive(&self, wait: Duration) -> Result<Option<QueueMessage>>;

    /// Delete a delivered message. A token that has already expired (the
    /// message was redelivered elsewhere) is not an error.
    async fn acknowledge(&self, message: &QueueMessage) -> Result<()>;
}
