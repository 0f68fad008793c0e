//! Delivery of job outcomes to the backend.
//!
//! The backend stores the first terminal status it receives for a job and
//! treats later deliveries of the same `(job_id, status)` as no-ops, so the
//! reporter may safely deliver the same outcome more than once.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use vsum_models::{CallbackRequest, JobIdentity, Outcome, ReportResult};

use crate::config::CallbackConfig;
use crate::error::WorkerResult;
use crate::logging::{JobLogger, LogStage};
use crate::metrics;
use crate::stage::Backoff;

const TOKEN_HEADER: &str = "X-Internal-Token";
const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers a terminal outcome for a job.
#[async_trait]
pub trait Reporter: Send + Sync {
    async fn report(&self, identity: &JobIdentity, outcome: &Outcome) -> ReportResult;
}

/// HTTP reporter for the backend's internal completion endpoint.
#[derive(Clone)]
pub struct CallbackReporter {
    http: Client,
    config: CallbackConfig,
    backoff: Backoff,
}

impl CallbackReporter {
    pub fn new(config: CallbackConfig) -> WorkerResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("ai-video-processor/{}", config.app_env))
            .build()?;
        let backoff = Backoff::new(config.retry_delay, config.max_delay);

        Ok(Self {
            http,
            config,
            backoff,
        })
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// `{base}/internal/jobs/{job_id}/complete`, with the id percent-encoded.
    pub fn completion_url(&self, job_id: &str) -> String {
        format!(
            "{}/internal/jobs/{}/complete",
            self.base_url(),
            urlencoding::encode(job_id)
        )
    }

    /// Whether the backend answers `GET /health` with 200.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.base_url());
        match self
            .http
            .get(&url)
            .header(TOKEN_HEADER, &self.config.internal_token)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                debug!("Backend health check failed: {}", e);
                false
            }
        }
    }

    async fn send_once(&self, url: &str, body: &[u8]) -> Result<StatusCode, reqwest::Error> {
        let response = self
            .http
            .post(url)
            .header(TOKEN_HEADER, &self.config.internal_token)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(body.to_vec())
            .send()
            .await?;
        Ok(response.status())
    }
}

#[async_trait]
impl Reporter for CallbackReporter {
    async fn report(&self, identity: &JobIdentity, outcome: &Outcome) -> ReportResult {
        let logger = JobLogger::new(identity);
        let url = self.completion_url(&identity.job_id);
        let max_attempts = self.config.max_attempts();

        let body = match serde_json::to_vec(&CallbackRequest::from_outcome(identity, outcome)) {
            Ok(body) => body,
            Err(e) => {
                logger.error(LogStage::CallbackFailed, &format!("Failed to encode callback: {}", e));
                metrics::record_callback(false, 0);
                return ReportResult::undelivered(0, None);
            }
        };

        let mut last_status = None;
        for attempt in 1..=max_attempts {
            match self.send_once(&url, &body).await {
                Ok(status) if status.is_success() => {
                    logger.info(
                        LogStage::CallbackSuccess,
                        &format!("Callback delivered: {} (attempt {})", outcome.status(), attempt),
                    );
                    metrics::record_callback(true, attempt);
                    return ReportResult::delivered(attempt, status.as_u16());
                }
                Ok(status) if status.is_server_error() => {
                    warn!(
                        job_id = %identity.job_id,
                        attempt,
                        max_attempts,
                        status = status.as_u16(),
                        "Callback server error"
                    );
                    last_status = Some(status.as_u16());
                }
                Ok(status) => {
                    logger.error(
                        LogStage::CallbackFailed,
                        &format!("Callback rejected with {}; not retrying", status.as_u16()),
                    );
                    metrics::record_callback(false, attempt);
                    return ReportResult::undelivered(attempt, Some(status.as_u16()));
                }
                Err(e) => {
                    warn!(
                        job_id = %identity.job_id,
                        attempt,
                        max_attempts,
                        "Callback transport error: {}", e
                    );
                    last_status = None;
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.backoff.delay_for_attempt(attempt)).await;
            }
        }

        logger.error(
            LogStage::CallbackFailed,
            &format!("Callback not delivered after {} attempts", max_attempts),
        );
        metrics::record_callback(false, max_attempts);
        ReportResult::undelivered(max_attempts, last_status)
    }
}
