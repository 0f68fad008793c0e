//! Work-item sources for the summary worker.
//!
//! This crate provides:
//! - The `WorkItemSource` trait (receive one item, acknowledge it)
//! - An AWS SQS source with long polling and visibility-timeout leases
//! - A Redis Streams source using a consumer group, re-claiming stale
//!   pending entries once their lease has expired

pub mod config;
pub mod error;
pub mod item;
pub mod redis_stream;
pub mod sqs;

use std::time::Duration;

use async_trait::async_trait;

pub use config::{QueueBackend, QueueConfig, RedisStreamConfig, SqsConfig};
pub use error::{QueueError, QueueResult};
pub use item::WorkItem;
pub use redis_stream::RedisStreamQueue;
pub use sqs::SqsWorkQueue;

/// A queue that hands out work items under a lease.
///
/// An item that is not acknowledged before its lease expires is delivered
/// again, possibly to another consumer.
#[async_trait]
pub trait WorkItemSource: Send + Sync {
    /// Wait up to `wait` for one item.
    async fn receive(&self, wait: Duration) -> QueueResult<Option<WorkItem>>;

    /// Remove an item permanently.
    async fn acknowledge(&self, item: &WorkItem) -> QueueResult<()>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Whether the backend sets repeatedly failing items aside on its own,
    /// as an SQS redrive policy does.
    fn redrives_poison_items(&self) -> bool {
        true
    }
}
