// SQS implementation of MessageQueue.
//
// Receives at most one message per call with long polling, and asks SQS for
// the ApproximateReceiveCount attribute so the worker can spot messages that
// keep coming back.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_sqs::types::{MessageSystemAttributeName, QueueAttributeName};
use aws_sdk_sqs::Client;
use tracing::{debug, warn};

use super::traits::{MessageQueue, QueueMessage};

pub struct SqsQueue {
    client: Client,
    queue_url: String,
}

/// Approximate queue depth, as reported by GetQueueAttributes.
#[derive(Debug, Clone, Default)]
pub struct QueueDepth {
    pub visible: Option<i64>,
    pub in_flight: Option<i64>,
}

impl SqsQueue {
    pub fn new(client: Client, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }

    /// Fetch visible and in-flight message counts for status display.
    pub async fn depth(&self) -> Result<QueueDepth> {
        let resp = self
            .client
            .get_queue_attributes()
            .queue_url(&self.queue_url)
            .attribute_names(QueueAttributeName::ApproximateNumberOfMessages)
            .attribute_names(QueueAttributeName::ApproximateNumberOfMessagesNotVisible)
            .send()
            .await
            .with_context(|| format!("Failed to read attributes of {}", self.queue_url))?;

        let read = |name: &QueueAttributeName| {
            resp.attributes()
                .and_then(|attrs| attrs.get(name))
                .and_then(|v| v.parse::<i64>().ok())
        };

        Ok(QueueDepth {
            visible: read(&QueueAttributeName::ApproximateNumberOfMessages),
            in_flight: read(&QueueAttributeName::ApproximateNumberOfMessagesNotVisible),
        })
    }
}

#[async_trait]
impl MessageQueue for SqsQueue {
    async fn receive(&self, wait: Duration) -> Result<Option<QueueMessage>> {
        let resp = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(1)
            .wait_time_seconds(i32::try_from(wait.as_secs()).unwrap_or(20))
            .message_system_attribute_names(MessageSystemAttributeName::ApproximateReceiveCount)
            .send()
            .await
            .with_context(|| format!("Failed to receive from {}", self.queue_url))?;

        let Some(msg) = resp.messages().first() else {
            return Ok(None);
        };

        // A message without a receipt handle can never be deleted; leave it
        // to expire back onto the queue.
        let Some(ack_token) = msg.receipt_handle() else {
            warn!(
                message_id = msg.message_id().unwrap_or("<none>"),
                "Received message without receipt handle, ignoring"
            );
            return Ok(None);
        };

        let receive_count = msg
            .attributes()
            .and_then(|attrs| attrs.get(&MessageSystemAttributeName::ApproximateReceiveCount))
            .and_then(|v| v.parse::<u32>().ok());

        let message = QueueMessage {
            message_id: msg.message_id().unwrap_or_default().to_string(),
            body: msg.body().unwrap_or_default().to_string(),
            ack_token: ack_token.to_string(),
            receive_count,
        };
        debug!(
            message_id = %message.message_id,
            receive_count = ?message.receive_count,
            "Received message"
        );
        Ok(Some(message))
    }

    async fn acknowledge(&self, message: &QueueMessage) -> Result<()> {
        let result = self
            .client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(&message.ack_token)
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_receipt_handle_is_invalid()) =>
            {
                warn!(
                    message_id = %message.message_id,
                    "Receipt handle no longer valid, message already redelivered or expired"
                );
                Ok(())
            }
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("Failed to delete message {}", message.message_id))),
        }
    }
}
