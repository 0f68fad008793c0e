//! Queue consumption loop.
//!
//! One cycle receives at most one work item and runs it to completion.
//! The item is acknowledged only once its outcome reached the backend;
//! otherwise it stays on the queue and its next delivery starts a fresh run.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use vsum_models::{parse_work_item, Intake};
use vsum_queue::{
    QueueBackend, QueueConfig, RedisStreamQueue, SqsWorkQueue, WorkItem, WorkItemSource,
};

use crate::error::WorkerResult;
use crate::metrics;
use crate::orchestrator::{JobOrchestrator, RunSummary};

/// Wait before the next cycle after a receive or acknowledge error.
pub const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// What one cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing was received
    Idle,
    /// A test notification was received and acknowledged
    Ignored,
    /// A job ran and its item was acknowledged
    Acknowledged,
    /// A job ran but its outcome was not delivered
    LeftForRedelivery,
    /// An unaddressable item was dropped from a source without redrive
    Discarded,
}

impl CycleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleOutcome::Idle => "idle",
            CycleOutcome::Ignored => "ignored",
            CycleOutcome::Acknowledged => "acknowledged",
            CycleOutcome::LeftForRedelivery => "left_for_redelivery",
            CycleOutcome::Discarded => "discarded",
        }
    }
}

/// A single consumer: one job at a time.
pub struct MessageLoop {
    name: String,
    source: Arc<dyn WorkItemSource>,
    orchestrator: Arc<JobOrchestrator>,
    wait: Duration,
    error_backoff: Duration,
}

impl MessageLoop {
    pub fn new(
        name: impl Into<String>,
        source: Arc<dyn WorkItemSource>,
        orchestrator: Arc<JobOrchestrator>,
        wait: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            orchestrator,
            wait,
            error_backoff: ERROR_BACKOFF,
        }
    }

    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    /// Receive, process and settle at most one work item.
    pub async fn run_once(&self) -> WorkerResult<CycleOutcome> {
        let Some(item) = self.source.receive(self.wait).await? else {
            return Ok(CycleOutcome::Idle);
        };

        if item.is_redelivery() {
            info!(
                consumer = %self.name,
                message_id = %item.message_id,
                receive_count = ?item.receive_count,
                "Redelivered work item, starting a fresh run"
            );
        }

        let summary = match parse_work_item(&item.body) {
            Ok(Intake::TestEvent) => {
                debug!(message_id = %item.message_id, "Ignoring S3 test notification");
                self.source.acknowledge(&item).await?;
                return Ok(CycleOutcome::Ignored);
            }
            Ok(Intake::Job(identity)) => self.orchestrator.run(identity).await,
            Err(e) => {
                warn!(message_id = %item.message_id, "{}", e);
                let summary = self.orchestrator.reject(&e).await;
                if e.identity.is_none() && !self.source.redrives_poison_items() {
                    // Nothing can ever report it, and the backend would hand it out forever
                    error!(
                        message_id = %item.message_id,
                        backend = self.source.backend(),
                        body = %truncate_body(&item.body),
                        "Discarding unaddressable work item"
                    );
                    self.source.acknowledge(&item).await?;
                    return Ok(CycleOutcome::Discarded);
                }
                summary
            }
        };

        self.settle(&item, &summary).await
    }

    async fn settle(&self, item: &WorkItem, summary: &RunSummary) -> WorkerResult<CycleOutcome> {
        if summary.report.delivered {
            self.source.acknowledge(item).await?;
            debug!(message_id = %item.message_id, "Acknowledged work item");
            Ok(CycleOutcome::Acknowledged)
        } else {
            warn!(
                message_id = %item.message_id,
                attempts = summary.report.attempts,
                status = ?summary.report.status_code,
                "Outcome not delivered; leaving work item for redelivery"
            );
            Ok(CycleOutcome::LeftForRedelivery)
        }
    }

    /// Run cycles until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// Shutdown is checked between cycles; a job in flight always finishes.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(consumer = %self.name, backend = self.source.backend(), "Message loop started");

        while !*shutdown.borrow() {
            match self.run_once().await {
                Ok(outcome) => metrics::record_cycle(outcome.as_str()),
                Err(e) => {
                    metrics::record_cycle("error");
                    error!(consumer = %self.name, "Message loop error: {}", e);
                    tokio::select! {
                        changed = shutdown.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                        _ = tokio::time::sleep(self.error_backoff) => {}
                    }
                }
            }
        }

        info!(consumer = %self.name, "Message loop stopped");
    }
}

fn truncate_body(body: &str) -> String {
    body.chars().take(200).collect()
}

/// Flip `shutdown` on SIGINT or SIGTERM. The task ends once it has sent.
///
/// The SIGTERM handler is installed before this returns.
pub fn listen_for_shutdown(shutdown: watch::Sender<bool>) -> std::io::Result<JoinHandle<()>> {
    let mut sigterm = signal(SignalKind::terminate())?;
    Ok(tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
            _ = sigterm.recv() => info!("Received SIGTERM"),
        }
        let _ = shutdown.send(true);
    }))
}

/// Connect the configured work-item source for loop number `index`.
///
/// Redis consumers get a per-loop consumer name.
pub async fn connect_source(
    config: &QueueConfig,
    index: usize,
) -> WorkerResult<Arc<dyn WorkItemSource>> {
    match config.backend {
        QueueBackend::Sqs => Ok(Arc::new(SqsWorkQueue::new(&config.sqs).await?)),
        QueueBackend::Redis => {
            let mut redis = config.redis.clone();
            redis.consumer_name = format!("{}-{}", redis.consumer_name, index);
            let queue = RedisStreamQueue::new(redis)?;
            queue.init().await?;
            Ok(Arc::new(queue))
        }
    }
}
