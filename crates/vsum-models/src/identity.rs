//! Job identity and S3 event intake.
//!
//! Work items carry an S3 event notification. The first record names the
//! uploaded object; the job and user ids are derived from its key:
//!
//! - `videos/{user_id}/{job_id}.{ext}` yields both ids
//! - any other key uses its file stem as the job id and has no user

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Identity of one job, derived once from the inbound work item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobIdentity {
    pub job_id: String,
    pub user_id: Option<String>,
    pub source_bucket: String,
    pub source_key: String,
}

impl fmt::Display for JobIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (s3://{}/{})", self.job_id, self.source_bucket, self.source_key)
    }
}

/// A work item body that could not be turned into a job.
#[derive(Debug, Clone, Error)]
#[error("Malformed work item: {message}")]
pub struct IntakeError {
    pub message: String,
    /// Best identity recoverable from the body, used to address the failure
    /// report. `None` when not even the object key was readable.
    pub identity: Option<JobIdentity>,
}

impl IntakeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            identity: None,
        }
    }

    fn with_identity(mut self, identity: Option<JobIdentity>) -> Self {
        self.identity = identity;
        self
    }
}

/// Result of parsing a work item body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intake {
    /// A job to run
    Job(JobIdentity),
    /// An S3 test notification; nothing to run
    TestEvent,
}

/// S3 event notification as delivered through the queue.
#[derive(Debug, Clone, Deserialize)]
pub struct S3EventNotification {
    #[serde(rename = "Records", default)]
    pub records: Option<Vec<S3EventRecord>>,
    /// Set to `s3:TestEvent` on the notification S3 sends when a bucket
    /// notification is first configured.
    #[serde(rename = "Event", default)]
    pub event: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3EventRecord {
    #[serde(rename = "eventTime", default)]
    pub event_time: Option<String>,
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Object {
    pub key: String,
    #[serde(default)]
    pub size: Option<u64>,
}

impl S3EventRecord {
    pub fn bucket_name(&self) -> &str {
        &self.s3.bucket.name
    }

    pub fn object_key(&self) -> &str {
        &self.s3.object.key
    }
}

/// Parse a raw work item body.
pub fn parse_work_item(body: &str) -> Result<Intake, IntakeError> {
    let notification: S3EventNotification = serde_json::from_str(body)
        .map_err(|e| IntakeError::new(format!("Invalid S3 event message: {}", e)))?;

    if notification.event.as_deref() == Some("s3:TestEvent") {
        return Ok(Intake::TestEvent);
    }

    let records = notification
        .records
        .ok_or_else(|| IntakeError::new("Invalid S3 event message: missing Records"))?;

    let Some(record) = records.first() else {
        return Ok(Intake::TestEvent);
    };

    let key = decode_object_key(record.object_key())?;
    let bucket = record.bucket_name().to_string();

    let (job_id, user_id) = match derive_ids_from_key(&key) {
        Ok(ids) => ids,
        Err(e) => {
            let fallback = fallback_job_id(&key).map(|job_id| JobIdentity {
                job_id,
                user_id: None,
                source_bucket: bucket.clone(),
                source_key: key.clone(),
            });
            return Err(e.with_identity(fallback));
        }
    };

    let identity = JobIdentity {
        job_id,
        user_id,
        source_bucket: bucket,
        source_key: key,
    };

    if identity.source_bucket.is_empty() {
        return Err(IntakeError::new("Invalid S3 event message: empty bucket name")
            .with_identity(Some(identity)));
    }

    Ok(Intake::Job(identity))
}

/// Derive `(job_id, user_id)` from an object key.
pub fn derive_ids_from_key(key: &str) -> Result<(String, Option<String>), IntakeError> {
    if key.is_empty() {
        return Err(IntakeError::new("Empty object key"));
    }

    let parts: Vec<&str> = key.split('/').collect();

    // `videos/{user_id}/{job_id}.{ext}`; deeper keys take the third segment
    if parts.len() >= 3 && parts[0] == "videos" {
        let stem = parts[2].split('.').next().unwrap_or_default();
        if stem.is_empty() || !stem.chars().all(is_job_id_char) {
            return Err(IntakeError::new(format!("Invalid job_id format: {:?}", stem)));
        }
        let user_id = Some(parts[1]).filter(|u| !u.is_empty()).map(str::to_string);
        return Ok((stem.to_string(), user_id));
    }

    let filename = parts.last().copied().unwrap_or_default();
    let stem = filename.split('.').next().unwrap_or_default();
    let job_id: String = stem.chars().filter(|c| is_job_id_char(*c)).collect();
    if job_id.is_empty() {
        return Err(IntakeError::new(format!(
            "Cannot derive job_id from key: {:?}",
            key
        )));
    }
    Ok((job_id, None))
}

fn is_job_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Keys in S3 notifications are form-encoded (`+` for space).
fn decode_object_key(raw: &str) -> Result<String, IntakeError> {
    let plus_decoded = raw.replace('+', " ");
    urlencoding::decode(&plus_decoded)
        .map(|k| k.into_owned())
        .map_err(|e| IntakeError::new(format!("Invalid object key encoding: {}", e)))
}

/// Whole-key job id used to address a failure report for an unparseable key.
fn fallback_job_id(key: &str) -> Option<String> {
    let id: String = key
        .chars()
        .map(|c| if is_job_id_char(c) { c } else { '_' })
        .collect();
    if id.trim_matches('_').is_empty() {
        None
    } else {
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(bucket: &str, key: &str) -> String {
        json!({
            "Records": [{
                "eventTime": "2025-11-22T05:01:23.000Z",
                "s3": {
                    "bucket": {"name": bucket},
                    "object": {"key": key, "size": 12345678}
                }
            }]
        })
        .to_string()
    }

    #[test]
    fn test_standard_key() {
        let intake = parse_work_item(&event("shortform-video-bucket", "videos/123/987654321.mp4")).unwrap();
        let Intake::Job(identity) = intake else {
            panic!("expected a job");
        };
        assert_eq!(identity.job_id, "987654321");
        assert_eq!(identity.user_id.as_deref(), Some("123"));
        assert_eq!(identity.source_bucket, "shortform-video-bucket");
        assert_eq!(identity.source_key, "videos/123/987654321.mp4");
    }

    #[test]
    fn test_url_encoded_key_is_decoded() {
        let intake = parse_work_item(&event("b", "videos%2Ftest_user_456%2Ftest_job_123.mp4")).unwrap();
        let Intake::Job(identity) = intake else {
            panic!("expected a job");
        };
        assert_eq!(identity.source_key, "videos/test_user_456/test_job_123.mp4");
        assert_eq!(identity.job_id, "test_job_123");
    }

    #[test]
    fn test_plus_decodes_to_space() {
        let (job_id, _) = derive_ids_from_key("uploads/my clip.mp4").unwrap();
        assert_eq!(job_id, "myclip");

        let intake = parse_work_item(&event("b", "uploads/my+clip.mp4")).unwrap();
        let Intake::Job(identity) = intake else {
            panic!("expected a job");
        };
        assert_eq!(identity.source_key, "uploads/my clip.mp4");
    }

    #[test]
    fn test_nested_videos_key_uses_third_segment() {
        let (job_id, user_id) = derive_ids_from_key("videos/u/a/b.mp4").unwrap();
        assert_eq!(job_id, "a");
        assert_eq!(user_id.as_deref(), Some("u"));
    }

    #[test]
    fn test_non_standard_key() {
        let (job_id, user_id) = derive_ids_from_key("uploads/some_file.mp4").unwrap();
        assert_eq!(job_id, "some_file");
        assert_eq!(user_id, None);
    }

    #[test]
    fn test_special_characters() {
        let err = derive_ids_from_key("videos/user-123/job_456!@#.mp4").unwrap_err();
        assert!(err.message.contains("Invalid job_id format"));

        let (job_id, user_id) = derive_ids_from_key("uploads/job_456!@#.mp4").unwrap();
        assert_eq!(job_id, "job_456");
        assert_eq!(user_id, None);
    }

    #[test]
    fn test_empty_key_is_malformed() {
        assert!(derive_ids_from_key("").is_err());

        let err = parse_work_item(&event("b", "")).unwrap_err();
        assert!(err.identity.is_none());
    }

    #[test]
    fn test_invalid_job_id_keeps_addressable_identity() {
        let err = parse_work_item(&event("b", "videos/u1/bad!id.mp4")).unwrap_err();
        let identity = err.identity.expect("fallback identity");
        assert_eq!(identity.job_id, "videos_u1_bad_id_mp4");
        assert_eq!(identity.source_key, "videos/u1/bad!id.mp4");
    }

    #[test]
    fn test_invalid_json() {
        let err = parse_work_item("invalid json content").unwrap_err();
        assert!(err.identity.is_none());
    }

    #[test]
    fn test_missing_records_is_malformed() {
        assert!(parse_work_item(r#"{"foo": 1}"#).is_err());
    }

    #[test]
    fn test_empty_records_is_test_event() {
        assert_eq!(parse_work_item(r#"{"Records": []}"#).unwrap(), Intake::TestEvent);
    }

    #[test]
    fn test_s3_test_event() {
        let body = r#"{"Service":"Amazon S3","Event":"s3:TestEvent","Bucket":"b"}"#;
        assert_eq!(parse_work_item(body).unwrap(), Intake::TestEvent);
    }

    #[test]
    fn test_empty_bucket_is_malformed_but_addressable() {
        let err = parse_work_item(&event("", "videos/1/2.mp4")).unwrap_err();
        assert_eq!(err.identity.unwrap().job_id, "2");
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let a = derive_ids_from_key("videos/9/abc-1.mov").unwrap();
        let b = derive_ids_from_key("videos/9/abc-1.mov").unwrap();
        assert_eq!(a, b);
    }
}
