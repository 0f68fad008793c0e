//! Anthropic Messages API client for transcript summaries.

use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::error::{AiError, AiResult};
use crate::types::{ApiErrorResponse, Message, MessagesRequest, MessagesResponse};

const SERVICE: &str = "Claude";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Korean summary prompt; `{transcript}` is replaced with the transcript.
const SUMMARY_PROMPT_TEMPLATE: &str = "다음은 동영상에서 추출한 음성 텍스트입니다.
이 내용을 바탕으로 간결하고 유용한 요약을 생성해 주세요.

주요 포인트:
- 핵심 내용과 메시지를 파악
- 중요한 키워드나 주제 강조
- 시청자가 빠르게 이해할 수 있도록 구조화
- 2-3문단 내외로 정리

음성 텍스트:
{transcript}

요약:";

/// Configuration for the Claude client.
#[derive(Debug, Clone)]
pub struct ClaudeConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.anthropic.com/v1/messages".to_string(),
            api_key: String::new(),
            model: "claude-3-7-sonnet-latest".to_string(),
            max_tokens: 2000,
            timeout: Duration::from_secs(60),
        }
    }
}

impl ClaudeConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_url: std::env::var("CLAUDE_API_URL").unwrap_or(defaults.api_url),
            api_key: std::env::var("CLAUDE_API_KEY").unwrap_or_default(),
            model: std::env::var("CLAUDE_MODEL").unwrap_or(defaults.model),
            max_tokens: std::env::var("CLAUDE_MAX_TOKENS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_tokens),
            timeout: Duration::from_secs(
                std::env::var("CLAUDE_TIMEOUT_SECONDS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
        }
    }
}

/// Client that asks Claude for a summary of a transcript.
#[derive(Clone)]
pub struct ClaudeClient {
    http: Client,
    config: ClaudeConfig,
}

impl ClaudeClient {
    pub fn new(config: ClaudeConfig) -> AiResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(AiError::Network)?;

        Ok(Self { http, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Summarize a transcript; returns the first content block, trimmed.
    pub async fn summarize(&self, transcript: &str) -> AiResult<String> {
        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            messages: vec![Message {
                role: "user",
                content: build_prompt(transcript),
            }],
        };

        debug!(
            model = %self.config.model,
            transcript_length = transcript.chars().count(),
            "Sending summary request to Claude"
        );

        let response = self
            .http
            .post(&self.config.api_url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| AiError::from_transport(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(AiError::from_status(SERVICE, status, detail));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AiError::from_transport(SERVICE, e))?;
        let parsed: MessagesResponse = serde_json::from_slice(&body)
            .map_err(|e| AiError::invalid_response(SERVICE, e.to_string()))?;

        let first = parsed
            .content
            .into_iter()
            .next()
            .ok_or_else(|| AiError::invalid_response(SERVICE, "no content blocks"))?;

        let summary = first.text.unwrap_or_default();
        let summary = summary.trim();
        if summary.is_empty() {
            return Err(AiError::EmptyResult(SERVICE));
        }

        Ok(summary.to_string())
    }
}

fn build_prompt(transcript: &str) -> String {
    SUMMARY_PROMPT_TEMPLATE.replace("{transcript}", transcript)
}
