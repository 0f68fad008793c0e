//! Result documents persisted after a successful run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use vsum_models::{JobIdentity, ProcessingMeta};

use crate::error::StorageResult;

pub const RESULT_CONTENT_TYPE: &str = "application/json; charset=utf-8";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub model: String,
    pub stt_engine: String,
}

/// JSON document written to the result bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultDocument {
    pub job_id: String,
    pub user_id: Option<String>,
    pub s3_bucket: String,
    pub s3_key: String,
    pub transcript: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
    pub metadata: ResultMetadata,
}

impl ResultDocument {
    pub fn new(
        identity: &JobIdentity,
        transcript: impl Into<String>,
        summary: impl Into<String>,
        meta: &ProcessingMeta,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            job_id: identity.job_id.clone(),
            user_id: identity.user_id.clone(),
            s3_bucket: identity.source_bucket.clone(),
            s3_key: identity.source_key.clone(),
            transcript: transcript.into(),
            summary: summary.into(),
            created_at,
            metadata: ResultMetadata {
                model: meta.model.clone(),
                stt_engine: meta.stt_engine.clone(),
            },
        }
    }

    /// Pretty-printed UTF-8 JSON.
    pub fn to_json_bytes(&self) -> StorageResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

/// Result key for a source object: `summary/summary_{video_name}.json`.
pub fn result_key(source_key: &str) -> String {
    let file_name = source_key.rsplit('/').next().unwrap_or(source_key);
    let video_name = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("summary/summary_{}.json", video_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_result_key() {
        assert_eq!(result_key("videos/user-123/hamzzi.mp4"), "summary/summary_hamzzi.json");
        assert_eq!(result_key("clip.tar.mp4"), "summary/summary_clip.tar.json");
    }

    #[test]
    fn test_document_json() {
        let identity = JobIdentity {
            job_id: "video-123".into(),
            user_id: Some("user-67890".into()),
            source_bucket: "shortform-video-bucket".into(),
            source_key: "videos/user-67890/video-123.mp4".into(),
        };
        let meta = ProcessingMeta {
            duration_ms: None,
            model: "claude-3-7-sonnet-latest".into(),
            stt_engine: "clova".into(),
        };
        let created_at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 45).unwrap();

        let doc = ResultDocument::new(&identity, "안녕하세요", "요약", &meta, created_at);
        let value: serde_json::Value = serde_json::from_slice(&doc.to_json_bytes().unwrap()).unwrap();

        assert_eq!(value["job_id"], "video-123");
        assert_eq!(value["user_id"], "user-67890");
        assert_eq!(value["transcript"], "안녕하세요");
        assert_eq!(value["created_at"], "2024-01-15T10:30:45Z");
        assert_eq!(value["metadata"]["stt_engine"], "clova");
    }
}
