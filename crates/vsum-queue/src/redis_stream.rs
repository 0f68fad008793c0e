//! Redis Streams work-item source.
//!
//! Entries are read through a consumer group. An entry stays in the group's
//! pending list until acknowledged; once it has been idle for longer than the
//! lease, the next `receive` on any consumer claims it with `XAUTOCLAIM`.

use std::time::Duration;

use async_trait::async_trait;
use redis::streams::{StreamAutoClaimReply, StreamId, StreamReadReply};
use tracing::{debug, info};

use crate::config::RedisStreamConfig;
use crate::error::{QueueError, QueueResult};
use crate::item::WorkItem;
use crate::WorkItemSource;

/// Field holding the message body in each stream entry.
pub const BODY_FIELD: &str = "body";

/// Redis Streams consumer.
pub struct RedisStreamQueue {
    client: redis::Client,
    config: RedisStreamConfig,
}

impl RedisStreamQueue {
    /// Create a new queue client.
    pub fn new(config: RedisStreamConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Create the consumer group if it does not exist yet.
    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(()) => info!("Created consumer group: {}", self.config.consumer_group),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!("Consumer group already exists: {}", self.config.consumer_group);
            }
            Err(e) => return Err(QueueError::Redis(e)),
        }

        Ok(())
    }

    /// Append a message body to the stream; returns the entry id.
    pub async fn enqueue(&self, body: &str) -> QueueResult<String> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let entry_id: String = redis::cmd("XADD")
            .arg(&self.config.stream_name)
            .arg("*")
            .arg(BODY_FIELD)
            .arg(body)
            .query_async(&mut conn)
            .await?;

        Ok(entry_id)
    }

    /// Claim one entry whose lease has expired.
    async fn claim_expired(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
    ) -> QueueResult<Option<WorkItem>> {
        let reply: StreamAutoClaimReply = redis::cmd("XAUTOCLAIM")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(&self.config.consumer_name)
            .arg(self.config.lease.as_millis() as u64)
            .arg("0-0")
            .arg("COUNT")
            .arg(1)
            .query_async(conn)
            .await?;

        Ok(reply.claimed.first().map(|entry| {
            let mut item = work_item_from_entry(entry);
            // Only entries delivered before can be pending
            item.receive_count = Some(2);
            info!(entry_id = %item.message_id, "Re-claimed expired stream entry");
            item
        }))
    }
}

#[async_trait]
impl WorkItemSource for RedisStreamQueue {
    async fn receive(&self, wait: Duration) -> QueueResult<Option<WorkItem>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        if let Some(item) = self.claim_expired(&mut conn).await? {
            return Ok(Some(item));
        }

        // BLOCK 0 would wait forever
        let block_ms = wait.as_millis().max(1) as u64;

        let reply: Option<StreamReadReply> = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(&self.config.consumer_name)
            .arg("COUNT")
            .arg(1)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">")
            .query_async(&mut conn)
            .await?;

        let item = reply
            .and_then(|r| r.keys.into_iter().next())
            .and_then(|key| key.ids.into_iter().next())
            .map(|entry| {
                let mut item = work_item_from_entry(&entry);
                item.receive_count = Some(1);
                item
            });

        if let Some(item) = &item {
            debug!(entry_id = %item.message_id, "Read stream entry");
        }
        Ok(item)
    }

    async fn acknowledge(&self, item: &WorkItem) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(&item.receipt)
            .query_async::<()>(&mut conn)
            .await?;

        redis::cmd("XDEL")
            .arg(&self.config.stream_name)
            .arg(&item.receipt)
            .query_async::<()>(&mut conn)
            .await?;

        debug!(entry_id = %item.receipt, "Acknowledged stream entry");
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }

    /// Expired entries are re-claimed forever; there is no dead-letter stream.
    fn redrives_poison_items(&self) -> bool {
        false
    }
}

/// Entries without a body field yield an empty body, which intake rejects
/// as malformed.
fn work_item_from_entry(entry: &StreamId) -> WorkItem {
    let body: String = entry.get(BODY_FIELD).unwrap_or_default();
    WorkItem::new(entry.id.clone(), entry.id.clone(), body)
}
