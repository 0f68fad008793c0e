//! Stage results and terminal job outcomes.

use serde::{Deserialize, Serialize};

use crate::ErrorKind;

/// Result of running one stage to exhaustion of its policy.
///
/// Never partially populated: either the artifact or a classified failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageResult<T> {
    Success(T),
    Failure { kind: ErrorKind, message: String },
}

impl<T> StageResult<T> {
    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StageResult::Success(_))
    }

    /// Convert into a `Result`, carrying the failure as a `Failed` outcome.
    pub fn into_result(self) -> Result<T, Outcome> {
        match self {
            StageResult::Success(v) => Ok(v),
            StageResult::Failure { kind, message } => Err(Outcome::failed(kind, message)),
        }
    }
}

/// Processing metadata attached to successful outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingMeta {
    /// Wall time from receipt to outcome
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Summarization model
    pub model: String,
    /// Speech-to-text engine
    pub stt_engine: String,
}

/// The single terminal result of one job run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done {
        transcript: String,
        summary: String,
        result_reference: Option<String>,
        meta: ProcessingMeta,
    },
    Failed {
        error_kind: ErrorKind,
        error_message: String,
    },
}

impl Outcome {
    pub fn failed(error_kind: ErrorKind, error_message: impl Into<String>) -> Self {
        Self::Failed {
            error_kind,
            error_message: error_message.into(),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done { .. })
    }

    /// Error kind of a failed outcome.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Outcome::Failed { error_kind, .. } => Some(*error_kind),
            Outcome::Done { .. } => None,
        }
    }

    /// Status string sent to the backend.
    pub fn status(&self) -> &'static str {
        match self {
            Outcome::Done { .. } => "DONE",
            Outcome::Failed { .. } => "FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_failure_becomes_failed_outcome() {
        let result: StageResult<()> = StageResult::failure(ErrorKind::DownloadFailed, "no such key");
        let outcome = result.into_result().unwrap_err();
        assert_eq!(outcome.error_kind(), Some(ErrorKind::DownloadFailed));
        assert_eq!(outcome.status(), "FAILED");
    }

    #[test]
    fn test_done_status() {
        let outcome = Outcome::Done {
            transcript: "t".into(),
            summary: "s".into(),
            result_reference: None,
            meta: ProcessingMeta {
                duration_ms: None,
                model: "m".into(),
                stt_engine: "clova".into(),
            },
        };
        assert!(outcome.is_done());
        assert_eq!(outcome.status(), "DONE");
        assert_eq!(outcome.error_kind(), None);
    }
}
