//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;
use vsum_ai_client::{ClaudeConfig, ClovaConfig};
use vsum_queue::{QueueBackend, QueueConfig};
use vsum_storage::StorageConfig;

use crate::error::{WorkerError, WorkerResult};

/// Retry settings shared by the processing stages.
#[derive(Debug, Clone)]
pub struct StageConfig {
    /// Attempts for stages that retry (download, transcription, summarization)
    pub max_attempts: u32,
    /// Backoff base; the wait after failure k is `base * 2^(k-1)`
    pub retry_delay: Duration,
    /// Backoff cap
    pub max_delay: Duration,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
        }
    }
}

/// Backend callback settings.
#[derive(Debug, Clone)]
pub struct CallbackConfig {
    pub base_url: String,
    pub internal_token: String,
    /// Sent in the user agent
    pub app_env: String,
    /// Retries after the first attempt
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub max_delay: Duration,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for CallbackConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            internal_token: String::new(),
            app_env: "dev".to_string(),
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            timeout: Duration::from_secs(30),
        }
    }
}

impl CallbackConfig {
    /// Total delivery attempts.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub app_env: String,
    /// Bucket uploads are expected in
    pub video_bucket: String,
    /// Root for per-job scratch directories
    pub work_dir: PathBuf,
    /// Independent message loops in this process
    pub concurrency: usize,
    /// Prometheus listener port; disabled when unset
    pub metrics_port: Option<u16>,
    /// Wall-clock limit for one ffmpeg run, in seconds
    pub ffmpeg_timeout_secs: u64,
    pub stage: StageConfig,
    pub callback: CallbackConfig,
    pub queue: QueueConfig,
    pub storage: StorageConfig,
    pub clova: ClovaConfig,
    pub claude: ClaudeConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            app_env: "dev".to_string(),
            video_bucket: "shortform-video-bucket".to_string(),
            work_dir: PathBuf::from("/tmp/vsum"),
            concurrency: 1,
            metrics_port: None,
            ffmpeg_timeout_secs: 300,
            stage: StageConfig::default(),
            callback: CallbackConfig::default(),
            queue: QueueConfig::default(),
            storage: StorageConfig::default(),
            clova: ClovaConfig::default(),
            claude: ClaudeConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        let retry_delay = Duration::from_secs(
            std::env::var("RETRY_DELAY_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        );
        let max_delay = Duration::from_secs(
            std::env::var("RETRY_MAX_DELAY_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
        );

        Ok(Self {
            video_bucket: std::env::var("VIDEO_BUCKET_NAME")
                .unwrap_or_else(|_| "shortform-video-bucket".to_string()),
            work_dir: PathBuf::from(
                std::env::var("WORKER_WORK_DIR").unwrap_or_else(|_| "/tmp/vsum".to_string()),
            ),
            concurrency: std::env::var("WORKER_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(1),
            metrics_port: std::env::var("METRICS_PORT")
                .ok()
                .and_then(|s| s.parse().ok()),
            ffmpeg_timeout_secs: std::env::var("FFMPEG_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
            stage: StageConfig {
                max_attempts: std::env::var("STAGE_MAX_ATTEMPTS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|n| *n > 0)
                    .unwrap_or(3),
                retry_delay,
                max_delay,
            },
            callback: CallbackConfig {
                base_url: std::env::var("BACKEND_BASE_URL").unwrap_or_default(),
                internal_token: std::env::var("BACKEND_INTERNAL_TOKEN").unwrap_or_default(),
                app_env: app_env.clone(),
                max_retries: std::env::var("MAX_RETRIES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3),
                retry_delay,
                max_delay,
                timeout: Duration::from_secs(
                    std::env::var("CALLBACK_TIMEOUT_SECONDS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(30),
                ),
            },
            queue: QueueConfig::from_env()?,
            storage: StorageConfig::from_env(),
            clova: ClovaConfig::from_env(),
            claude: ClaudeConfig::from_env(),
            app_env,
        })
    }

    /// Check that every required setting is present and well formed.
    ///
    /// All missing settings are reported together.
    pub fn validate(&self) -> WorkerResult<()> {
        let mut required = vec![
            ("BACKEND_INTERNAL_TOKEN", self.callback.internal_token.as_str()),
            ("CLOVA_API_KEY_ID", self.clova.api_key_id.as_str()),
            ("CLOVA_API_KEY", self.clova.api_key.as_str()),
            ("CLAUDE_API_KEY", self.claude.api_key.as_str()),
        ];
        if self.queue.backend == QueueBackend::Sqs {
            required.push(("SQS_QUEUE_URL", self.queue.sqs.queue_url.as_str()));
        }
        required.push(("BACKEND_BASE_URL", self.callback.base_url.as_str()));

        let missing: Vec<String> = required
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(WorkerError::MissingSettings(missing));
        }

        self.queue.validate()?;

        if !is_http_url(&self.callback.base_url) {
            return Err(WorkerError::config(format!(
                "Invalid Backend URL format: {}",
                self.callback.base_url
            )));
        }

        if !is_anthropic_url(&self.claude.api_url) {
            return Err(WorkerError::config(format!(
                "Invalid Claude API URL format: {}",
                self.claude.api_url
            )));
        }

        Ok(())
    }
}

fn is_http_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .unwrap_or(false)
}

fn is_anthropic_url(raw: &str) -> bool {
    Url::parse(raw)
        .ok()
        .filter(|url| url.scheme() == "https")
        .and_then(|url| url.host_str().map(|h| h == "anthropic.com" || h.ends_with(".anthropic.com")))
        .unwrap_or(false)
}
