//! AWS SQS work-item source.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sqs::config::Region;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::{Message, MessageSystemAttributeName};
use aws_sdk_sqs::Client;
use tracing::{debug, warn};

use crate::config::SqsConfig;
use crate::error::{QueueError, QueueResult};
use crate::item::WorkItem;
use crate::WorkItemSource;

/// SQS caps long polling at 20 seconds.
const MAX_WAIT_SECS: u64 = 20;

/// Consumes one message at a time from an SQS queue.
///
/// The visibility timeout is the lease: a message that is not deleted
/// becomes visible again once it expires.
#[derive(Clone, Debug)]
pub struct SqsWorkQueue {
    client: Client,
    queue_url: String,
    visibility_timeout: Duration,
}

impl SqsWorkQueue {
    /// Build a client from the default AWS credential chain.
    pub async fn new(config: &SqsConfig) -> QueueResult<Self> {
        if config.queue_url.trim().is_empty() {
            return Err(QueueError::config("SQS_QUEUE_URL is not set"));
        }

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_sqs::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        Ok(Self::from_client(
            Client::from_conf(builder.build()),
            config.queue_url.clone(),
            config.visibility_timeout,
        ))
    }

    pub fn from_client(client: Client, queue_url: String, visibility_timeout: Duration) -> Self {
        Self {
            client,
            queue_url,
            visibility_timeout,
        }
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

#[async_trait]
impl WorkItemSource for SqsWorkQueue {
    async fn receive(&self, wait: Duration) -> QueueResult<Option<WorkItem>> {
        let wait_secs = wait.as_secs().min(MAX_WAIT_SECS) as i32;

        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(1)
            .wait_time_seconds(wait_secs)
            .visibility_timeout(self.visibility_timeout.as_secs() as i32)
            .message_system_attribute_names(MessageSystemAttributeName::ApproximateReceiveCount)
            .send()
            .await
            .map_err(|e| QueueError::receive_failed(DisplayErrorContext(&e).to_string()))?;

        let Some(message) = output.messages().first() else {
            return Ok(None);
        };

        match work_item_from_message(message) {
            Some(item) => {
                debug!(
                    message_id = %item.message_id,
                    receive_count = ?item.receive_count,
                    "Received SQS message"
                );
                Ok(Some(item))
            }
            None => {
                // Without a receipt handle the message cannot be deleted;
                // it will reappear after the visibility timeout.
                warn!("SQS message without receipt handle, skipping");
                Ok(None)
            }
        }
    }

    async fn acknowledge(&self, item: &WorkItem) -> QueueResult<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(&item.receipt)
            .send()
            .await
            .map_err(|e| QueueError::ack_failed(DisplayErrorContext(&e).to_string()))?;

        debug!(message_id = %item.message_id, "Deleted SQS message");
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "sqs"
    }
}

/// Convert an SQS message; `None` if it has no receipt handle.
fn work_item_from_message(message: &Message) -> Option<WorkItem> {
    let receipt = message.receipt_handle()?;
    let receive_count = message
        .attributes()
        .and_then(|a| a.get(&MessageSystemAttributeName::ApproximateReceiveCount))
        .and_then(|v| v.parse().ok());

    Some(WorkItem {
        message_id: message.message_id().unwrap_or_default().to_string(),
        receipt: receipt.to_string(),
        body: message.body().unwrap_or_default().to_string(),
        receive_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_item_from_message() {
        let message = Message::builder()
            .message_id("m-1")
            .receipt_handle("rh-1")
            .body(r#"{"Records":[]}"#)
            .attributes(MessageSystemAttributeName::ApproximateReceiveCount, "3")
            .build();

        let item = work_item_from_message(&message).unwrap();
        assert_eq!(item.message_id, "m-1");
        assert_eq!(item.receipt, "rh-1");
        assert_eq!(item.body, r#"{"Records":[]}"#);
        assert_eq!(item.receive_count, Some(3));
        assert!(item.is_redelivery());
    }

    #[test]
    fn test_message_without_receipt() {
        let message = Message::builder().message_id("m-2").body("{}").build();
        assert!(work_item_from_message(&message).is_none());
    }

    #[tokio::test]
    #[ignore = "requires SQS access; set SQS_QUEUE_URL"]
    async fn test_receive_from_real_queue() {
        let config = crate::QueueConfig::from_env().unwrap();
        let queue = SqsWorkQueue::new(&config.sqs).await.unwrap();
        let _ = queue.receive(Duration::from_secs(1)).await.unwrap();
    }
}
