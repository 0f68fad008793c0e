//! Backend callback wire types.

use serde::{Deserialize, Serialize};

use crate::{ErrorKind, JobIdentity, Outcome, ProcessingMeta};

/// Terminal status reported to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallbackStatus {
    Done,
    Failed,
}

/// Body of `POST /internal/jobs/{job_id}/complete`.
///
/// Fields that do not apply to the status are omitted from the JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackRequest {
    pub status: CallbackStatus,
    pub s3_bucket: String,
    pub s3_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_s3_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ProcessingMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl CallbackRequest {
    /// Build the request body for an outcome.
    pub fn from_outcome(identity: &JobIdentity, outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Done {
                transcript,
                summary,
                result_reference,
                meta,
            } => Self {
                status: CallbackStatus::Done,
                s3_bucket: identity.source_bucket.clone(),
                s3_key: identity.source_key.clone(),
                transcript: Some(transcript.clone()),
                summary: Some(summary.clone()),
                result_s3_key: result_reference.clone(),
                meta: Some(meta.clone()),
                error_code: None,
                error_message: None,
            },
            Outcome::Failed {
                error_kind,
                error_message,
            } => Self {
                status: CallbackStatus::Failed,
                s3_bucket: identity.source_bucket.clone(),
                s3_key: identity.source_key.clone(),
                transcript: None,
                summary: None,
                result_s3_key: None,
                meta: None,
                error_code: Some(*error_kind),
                error_message: Some(error_message.clone()),
            },
        }
    }
}

/// What the reporter achieved for one outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportResult {
    /// The backend acknowledged the callback with a 2xx
    pub delivered: bool,
    /// HTTP attempts made (0 when the outcome was not addressable)
    pub attempts: u32,
    /// Last HTTP status seen, if any
    pub status_code: Option<u16>,
}

impl ReportResult {
    pub fn delivered(attempts: u32, status_code: u16) -> Self {
        Self {
            delivered: true,
            attempts,
            status_code: Some(status_code),
        }
    }

    pub fn undelivered(attempts: u32, status_code: Option<u16>) -> Self {
        Self {
            delivered: false,
            attempts,
            status_code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn identity() -> JobIdentity {
        JobIdentity {
            job_id: "987654321".into(),
            user_id: Some("123".into()),
            source_bucket: "shortform-video-bucket".into(),
            source_key: "videos/123/987654321.mp4".into(),
        }
    }

    #[test]
    fn test_success_body() {
        let outcome = Outcome::Done {
            transcript: "hello there".into(),
            summary: "a greeting".into(),
            result_reference: Some("summary/summary_987654321.json".into()),
            meta: ProcessingMeta {
                duration_ms: Some(1500),
                model: "claude-3-7-sonnet-latest".into(),
                stt_engine: "clova".into(),
            },
        };

        let body = serde_json::to_value(CallbackRequest::from_outcome(&identity(), &outcome)).unwrap();
        assert_eq!(
            body,
            json!({
                "status": "DONE",
                "s3_bucket": "shortform-video-bucket",
                "s3_key": "videos/123/987654321.mp4",
                "transcript": "hello there",
                "summary": "a greeting",
                "result_s3_key": "summary/summary_987654321.json",
                "meta": {
                    "duration_ms": 1500,
                    "model": "claude-3-7-sonnet-latest",
                    "stt_engine": "clova"
                }
            })
        );
    }

    #[test]
    fn test_failure_body_omits_success_fields() {
        let outcome = Outcome::failed(ErrorKind::TranscriptionTimeout, "Clova STT API timeout");

        let body = serde_json::to_value(CallbackRequest::from_outcome(&identity(), &outcome)).unwrap();
        assert_eq!(
            body,
            json!({
                "status": "FAILED",
                "s3_bucket": "shortform-video-bucket",
                "s3_key": "videos/123/987654321.mp4",
                "error_code": "TRANSCRIPTION_TIMEOUT",
                "error_message": "Clova STT API timeout"
            })
        );
    }
}
