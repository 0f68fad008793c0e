//! AI client error types.

use reqwest::StatusCode;
use thiserror::Error;

pub type AiResult<T> = Result<T, AiError>;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("{0} API timeout")]
    Timeout(&'static str),

    #[error("{0} API rate limit exceeded")]
    RateLimited(&'static str),

    #[error("{0} API authentication failed")]
    Unauthorized(&'static str),

    #[error("{service} API server error: {status}")]
    Server { service: &'static str, status: u16 },

    #[error("{service} API error: {status} - {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("Invalid response format from {service}: {message}")]
    InvalidResponse {
        service: &'static str,
        message: String,
    },

    #[error("Empty result received from {0}")]
    EmptyResult(&'static str),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AiError {
    pub fn invalid_response(service: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            service,
            message: message.into(),
        }
    }

    /// Map a transport error, separating timeouts from other failures.
    pub fn from_transport(service: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(service)
        } else {
            Self::Network(err)
        }
    }

    /// Map a non-success HTTP status.
    pub fn from_status(service: &'static str, status: StatusCode, message: impl Into<String>) -> Self {
        match status.as_u16() {
            429 => Self::RateLimited(service),
            401 | 403 => Self::Unauthorized(service),
            code if status.is_server_error() => Self::Server {
                service,
                status: code,
            },
            code => Self::Api {
                service,
                status: code,
                message: message.into(),
            },
        }
    }

    /// Timeouts and rate limiting both mean "the service did not answer in time".
    pub fn is_timeout(&self) -> bool {
        matches!(self, AiError::Timeout(_) | AiError::RateLimited(_))
    }

    /// Whether the same request could succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            AiError::Unauthorized(_) | AiError::Api { .. } | AiError::Config(_) | AiError::Io(_)
        )
    }
}
