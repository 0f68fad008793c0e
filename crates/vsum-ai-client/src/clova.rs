//! Clova speech-to-text client.

use std::path::Path;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::debug;

use crate::error::{AiError, AiResult};
use crate::types::ClovaSttResponse;

const SERVICE: &str = "Clova STT";

/// Engine name reported in processing metadata.
pub const STT_ENGINE: &str = "clova";

/// Configuration for the Clova STT client.
#[derive(Debug, Clone)]
pub struct ClovaConfig {
    /// Full recognition URL, including the language query
    pub url: String,
    pub api_key_id: String,
    pub api_key: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for ClovaConfig {
    fn default() -> Self {
        Self {
            url: "https://naveropenapi.apigw.ntruss.com/recog/v1/stt?lang=Kor".to_string(),
            api_key_id: String::new(),
            api_key: String::new(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl ClovaConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: std::env::var("CLOVA_STT_URL").unwrap_or(defaults.url),
            api_key_id: std::env::var("CLOVA_API_KEY_ID").unwrap_or_default(),
            api_key: std::env::var("CLOVA_API_KEY").unwrap_or_default(),
            timeout: Duration::from_secs(
                std::env::var("CLOVA_TIMEOUT_SECONDS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
        }
    }
}

/// Client for the Clova STT recognition endpoint.
#[derive(Clone)]
pub struct ClovaSttClient {
    http: Client,
    config: ClovaConfig,
}

impl ClovaSttClient {
    pub fn new(config: ClovaConfig) -> AiResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(AiError::Network)?;

        Ok(Self { http, config })
    }

    pub fn engine(&self) -> &'static str {
        STT_ENGINE
    }

    /// Transcribe a WAV file.
    pub async fn transcribe(&self, audio_path: &Path) -> AiResult<String> {
        let audio = tokio::fs::read(audio_path).await?;
        self.transcribe_bytes(audio).await
    }

    /// Transcribe raw audio bytes.
    pub async fn transcribe_bytes(&self, audio: Vec<u8>) -> AiResult<String> {
        debug!("Sending {} bytes to Clova STT", audio.len());

        let response = self
            .http
            .post(&self.config.url)
            .header("X-NCP-APIGW-API-KEY-ID", &self.config.api_key_id)
            .header("X-NCP-APIGW-API-KEY", &self.config.api_key)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(audio)
            .send()
            .await
            .map_err(|e| AiError::from_transport(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::from_status(SERVICE, status, body));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AiError::from_transport(SERVICE, e))?;
        let parsed: ClovaSttResponse = serde_json::from_slice(&body)
            .map_err(|e| AiError::invalid_response(SERVICE, e.to_string()))?;

        match parsed.text {
            Some(text) if !text.is_empty() => Ok(text),
            _ => Err(AiError::EmptyResult(SERVICE)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_bytes, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, timeout: Duration) -> ClovaSttClient {
        ClovaSttClient::new(ClovaConfig {
            url: format!("{}/recog/v1/stt?lang=Kor", server.uri()),
            api_key_id: "key-id".into(),
            api_key: "secret".into(),
            timeout,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_transcribe_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/recog/v1/stt"))
            .and(query_param("lang", "Kor"))
            .and(header("X-NCP-APIGW-API-KEY-ID", "key-id"))
            .and(header("X-NCP-APIGW-API-KEY", "secret"))
            .and(header("content-type", "application/octet-stream"))
            .and(body_bytes(b"RIFF....WAVE".to_vec()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "안녕하세요 여러분"})))
            .expect(1)
            .mount(&server)
            .await;

        let text = client(&server, Duration::from_secs(5))
            .transcribe_bytes(b"RIFF....WAVE".to_vec())
            .await
            .unwrap();
        assert_eq!(text, "안녕하세요 여러분");
    }

    #[tokio::test]
    async fn test_transcribe_reads_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "from file"})))
            .mount(&server)
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let audio = dir.path().join("a.wav");
        tokio::fs::write(&audio, b"RIFF").await.unwrap();

        let text = client(&server, Duration::from_secs(5)).transcribe(&audio).await.unwrap();
        assert_eq!(text, "from file");
    }

    #[tokio::test]
    async fn test_rate_limit_is_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = client(&server, Duration::from_secs(5))
            .transcribe_bytes(vec![0; 4])
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_slow_response_is_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"text": "late"}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let err = client(&server, Duration::from_millis(50))
            .transcribe_bytes(vec![0; 4])
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_empty_text_is_bad_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": ""})))
            .mount(&server)
            .await;

        let err = client(&server, Duration::from_secs(5))
            .transcribe_bytes(vec![0; 4])
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::EmptyResult(_)));
        assert!(!err.is_timeout());
    }

    #[tokio::test]
    async fn test_server_error_and_bad_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let stt = client(&server, Duration::from_secs(5));
        let first = stt.transcribe_bytes(vec![0; 4]).await.unwrap_err();
        assert!(matches!(first, AiError::Server { status: 503, .. }));

        let second = stt.transcribe_bytes(vec![0; 4]).await.unwrap_err();
        assert!(matches!(second, AiError::InvalidResponse { .. }));
    }
}
