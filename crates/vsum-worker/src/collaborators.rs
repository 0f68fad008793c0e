//! External collaborators of the orchestrator and their production adapters.
//!
//! Every collaborator reports failures as a [`StageError`]; the adapters
//! convert their crate's error type on the way out.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use vsum_ai_client::{ClaudeClient, ClovaSttClient};
use vsum_media::{extract_audio, is_supported_video, video_output_path, AudioFilterStrategy, FfmpegRunner};
use vsum_storage::result::RESULT_CONTENT_TYPE;
use vsum_storage::S3Client;

use crate::stage::StageError;

/// Fetches source videos to local disk.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Download `bucket/key` into the job's scratch directory.
    async fn download(&self, job_id: &str, bucket: &str, key: &str) -> Result<PathBuf, StageError>;

    /// Directory holding every local file of the job; removed after the run.
    fn scratch_dir(&self, job_id: &str) -> PathBuf;
}

/// Persists result documents; returns the stored object's key.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn upload(&self, key: &str, body: Vec<u8>) -> Result<String, StageError>;
}

/// Extracts speech audio from a video.
#[async_trait]
pub trait MediaTranscoder: Send + Sync {
    async fn extract_audio(
        &self,
        video: &Path,
        strategy: AudioFilterStrategy,
    ) -> Result<PathBuf, StageError>;
}

/// Speech-to-text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<String, StageError>;

    /// Engine name reported in processing metadata.
    fn engine(&self) -> &str;
}

/// Text summarization.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String, StageError>;

    /// Model name reported in processing metadata.
    fn model(&self) -> &str;
}

/// S3 download into `{work_dir}/{job_id}/`.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: S3Client,
    work_dir: PathBuf,
}

impl S3ObjectStore {
    pub fn new(client: S3Client, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            work_dir: work_dir.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn download(&self, job_id: &str, bucket: &str, key: &str) -> Result<PathBuf, StageError> {
        if !is_supported_video(key) {
            return Err(StageError::other(format!("Unsupported video format: {}", key)).permanent());
        }

        let path = video_output_path(&self.work_dir, job_id, key);
        let bytes = self.client.download_file(bucket, key, &path).await?;
        if bytes == 0 {
            return Err(StageError::other(format!("Downloaded file is empty: s3://{}/{}", bucket, key)));
        }
        Ok(path)
    }

    fn scratch_dir(&self, job_id: &str) -> PathBuf {
        self.work_dir.join(job_id)
    }
}

/// S3 upload into the result bucket.
#[derive(Clone)]
pub struct S3ResultStore {
    client: S3Client,
    bucket: String,
}

impl S3ResultStore {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl ResultStore for S3ResultStore {
    async fn upload(&self, key: &str, body: Vec<u8>) -> Result<String, StageError> {
        self.client
            .upload_bytes(&self.bucket, key, body, RESULT_CONTENT_TYPE)
            .await?;
        Ok(key.to_string())
    }
}

/// ffmpeg-backed audio extraction; the WAV is written next to the video.
#[derive(Debug, Clone, Default)]
pub struct FfmpegTranscoder {
    runner: FfmpegRunner,
}

impl FfmpegTranscoder {
    pub fn new(runner: FfmpegRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl MediaTranscoder for FfmpegTranscoder {
    async fn extract_audio(
        &self,
        video: &Path,
        strategy: AudioFilterStrategy,
    ) -> Result<PathBuf, StageError> {
        let output = video.with_extension("wav");
        debug!(strategy = %strategy, video = %video.display(), "Extracting audio");
        Ok(extract_audio(video, &output, strategy, &self.runner).await?)
    }
}

#[async_trait]
impl Transcriber for ClovaSttClient {
    async fn transcribe(&self, audio: &Path) -> Result<String, StageError> {
        Ok(ClovaSttClient::transcribe(self, audio).await?)
    }

    fn engine(&self) -> &str {
        ClovaSttClient::engine(self)
    }
}

#[async_trait]
impl Summarizer for ClaudeClient {
    async fn summarize(&self, text: &str) -> Result<String, StageError> {
        Ok(ClaudeClient::summarize(self, text).await?)
    }

    fn model(&self) -> &str {
        ClaudeClient::model(self)
    }
}
