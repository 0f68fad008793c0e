//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingSettings(Vec<String>),

    #[error("Queue error: {0}")]
    Queue(#[from] vsum_queue::QueueError),

    #[error("Storage error: {0}")]
    Storage(#[from] vsum_storage::StorageError),

    #[error("Media error: {0}")]
    Media(#[from] vsum_media::MediaError),

    #[error("AI client error: {0}")]
    Ai(#[from] vsum_ai_client::AiError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Errors that stop the process at startup rather than a single cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(self, WorkerError::Config(_) | WorkerError::MissingSettings(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_settings_lists_every_name() {
        let err = WorkerError::MissingSettings(vec![
            "CLAUDE_API_KEY".to_string(),
            "BACKEND_BASE_URL".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Missing required environment variables: CLAUDE_API_KEY, BACKEND_BASE_URL"
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn test_queue_error_is_not_fatal() {
        let err: WorkerError = vsum_queue::QueueError::receive_failed("timeout").into();
        assert!(!err.is_fatal());
    }
}
