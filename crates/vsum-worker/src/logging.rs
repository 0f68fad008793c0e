//! Structured job logging.
//!
//! Every lifecycle event of a job is logged with the same `job_id`,
//! `user_id` and `stage` fields so a single job can be followed across
//! stages in aggregated logs.

use std::fmt;

use tracing::{error, info, warn, Span};
use vsum_models::JobIdentity;

/// Lifecycle event tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStage {
    JobStart,
    DownloadStart,
    DownloadDone,
    FfmpegStart,
    FfmpegDone,
    SttStart,
    SttDone,
    LlmStart,
    LlmDone,
    UploadDone,
    CallbackSuccess,
    CallbackFailed,
    JobDone,
    JobFailed,
}

impl LogStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStage::JobStart => "JOB_START",
            LogStage::DownloadStart => "DOWNLOAD_START",
            LogStage::DownloadDone => "DOWNLOAD_DONE",
            LogStage::FfmpegStart => "FFMPEG_START",
            LogStage::FfmpegDone => "FFMPEG_DONE",
            LogStage::SttStart => "STT_START",
            LogStage::SttDone => "STT_DONE",
            LogStage::LlmStart => "LLM_START",
            LogStage::LlmDone => "LLM_DONE",
            LogStage::UploadDone => "UPLOAD_DONE",
            LogStage::CallbackSuccess => "CALLBACK_SUCCESS",
            LogStage::CallbackFailed => "CALLBACK_FAILED",
            LogStage::JobDone => "JOB_DONE",
            LogStage::JobFailed => "JOB_FAILED",
        }
    }
}

impl fmt::Display for LogStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job logger carrying the identity fields of one job.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    user_id: String,
}

impl JobLogger {
    pub fn new(identity: &JobIdentity) -> Self {
        Self::from_ids(&identity.job_id, identity.user_id.as_deref())
    }

    /// Logger for ids that did not come from a parsed identity.
    pub fn from_ids(job_id: &str, user_id: Option<&str>) -> Self {
        Self {
            job_id: job_id.to_string(),
            user_id: user_id.unwrap_or("-").to_string(),
        }
    }

    pub fn info(&self, stage: LogStage, message: &str) {
        info!(
            job_id = %self.job_id,
            user_id = %self.user_id,
            stage = %stage,
            "{}", message
        );
    }

    pub fn warn(&self, stage: LogStage, message: &str) {
        warn!(
            job_id = %self.job_id,
            user_id = %self.user_id,
            stage = %stage,
            "{}", message
        );
    }

    pub fn error(&self, stage: LogStage, message: &str) {
        error!(
            job_id = %self.job_id,
            user_id = %self.user_id,
            stage = %stage,
            "{}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Span wrapping one orchestration run.
    pub fn span(&self) -> Span {
        tracing::info_span!("job", job_id = %self.job_id, user_id = %self.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_from_identity() {
        let identity = JobIdentity {
            job_id: "987654321".into(),
            user_id: Some("123".into()),
            source_bucket: "b".into(),
            source_key: "videos/123/987654321.mp4".into(),
        };
        let logger = JobLogger::new(&identity);
        assert_eq!(logger.job_id(), "987654321");
        assert_eq!(logger.user_id(), "123");
    }

    #[test]
    fn test_logger_without_user() {
        let logger = JobLogger::from_ids("clip_1", None);
        assert_eq!(logger.user_id(), "-");
    }

    #[test]
    fn test_stage_tags() {
        assert_eq!(LogStage::FfmpegStart.as_str(), "FFMPEG_START");
        assert_eq!(LogStage::CallbackFailed.to_string(), "CALLBACK_FAILED");
    }
}
