//! Video summary worker.
//!
//! This crate provides:
//! - Stage execution with retry, backoff and fallback strategies
//! - Classification of stage failures into the reported error taxonomy
//! - The job orchestrator and its collaborator adapters
//! - Outcome delivery to the backend
//! - The queue consumption loop with graceful shutdown

pub mod callback;
pub mod classifier;
pub mod collaborators;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod message_loop;
pub mod metrics;
pub mod orchestrator;
pub mod stage;

pub use callback::{CallbackReporter, Reporter};
pub use classifier::classify;
pub use collaborators::{
    FfmpegTranscoder, MediaTranscoder, ObjectStore, ResultStore, S3ObjectStore, S3ResultStore,
    Summarizer, Transcriber,
};
pub use config::{CallbackConfig, StageConfig, WorkerConfig};
pub use context::JobContext;
pub use error::{WorkerError, WorkerResult};
pub use logging::{JobLogger, LogStage};
pub use message_loop::{connect_source, listen_for_shutdown, CycleOutcome, MessageLoop};
pub use orchestrator::{Collaborators, JobOrchestrator, RunSummary, StagePolicies};
pub use stage::{Backoff, FailureSignal, StageError, StageExecutor, StagePolicy};
