//! Queue configuration.

use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::error::{QueueError, QueueResult};

/// Which work-item source to consume from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueBackend {
    #[default]
    Sqs,
    Redis,
}

impl FromStr for QueueBackend {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqs" => Ok(QueueBackend::Sqs),
            "redis" => Ok(QueueBackend::Redis),
            other => Err(QueueError::config(format!(
                "unknown QUEUE_BACKEND '{}' (expected sqs or redis)",
                other
            ))),
        }
    }
}

/// SQS source configuration.
#[derive(Debug, Clone)]
pub struct SqsConfig {
    pub queue_url: String,
    pub region: String,
    /// Custom endpoint (LocalStack); `None` for AWS
    pub endpoint_url: Option<String>,
    /// Long-poll wait, capped at 20 s by SQS
    pub wait_time: Duration,
    /// Lease length for a received message
    pub visibility_timeout: Duration,
}

impl Default for SqsConfig {
    fn default() -> Self {
        Self {
            queue_url: String::new(),
            region: "ap-northeast-2".to_string(),
            endpoint_url: None,
            wait_time: Duration::from_secs(10),
            visibility_timeout: Duration::from_secs(90),
        }
    }
}

/// Redis Streams source configuration.
#[derive(Debug, Clone)]
pub struct RedisStreamConfig {
    /// Redis URL
    pub redis_url: String,
    /// Stream name for work items
    pub stream_name: String,
    /// Consumer group name
    pub consumer_group: String,
    /// Consumer name within the group; unique per loop
    pub consumer_name: String,
    /// Idle time after which another consumer may claim a pending entry
    pub lease: Duration,
}

impl Default for RedisStreamConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            stream_name: "vsum:jobs".to_string(),
            consumer_group: "vsum:workers".to_string(),
            consumer_name: format!("worker-{}", uuid::Uuid::new_v4()),
            lease: Duration::from_secs(90),
        }
    }
}

/// Queue configuration.
#[derive(Debug, Clone, Default)]
pub struct QueueConfig {
    pub backend: QueueBackend,
    pub sqs: SqsConfig,
    pub redis: RedisStreamConfig,
}

impl QueueConfig {
    /// Create config from environment variables.
    ///
    /// An unrecognised `QUEUE_BACKEND` is an error rather than a silent default.
    pub fn from_env() -> QueueResult<Self> {
        let sqs_defaults = SqsConfig::default();
        let redis_defaults = RedisStreamConfig::default();

        let backend = match std::env::var("QUEUE_BACKEND") {
            Ok(v) if !v.trim().is_empty() => v.parse()?,
            _ => QueueBackend::default(),
        };

        // The visibility timeout doubles as the Redis lease so both
        // backends redeliver on the same schedule.
        let lease_secs = std::env::var("SQS_VISIBILITY_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(90);

        Ok(Self {
            backend,
            sqs: SqsConfig {
                queue_url: std::env::var("SQS_QUEUE_URL").unwrap_or_default(),
                region: std::env::var("AWS_REGION").unwrap_or(sqs_defaults.region),
                endpoint_url: std::env::var("SQS_ENDPOINT_URL")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
                wait_time: Duration::from_secs(
                    std::env::var("SQS_WAIT_TIME_SECONDS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(10),
                ),
                visibility_timeout: Duration::from_secs(lease_secs),
            },
            redis: RedisStreamConfig {
                redis_url: std::env::var("REDIS_URL").unwrap_or(redis_defaults.redis_url),
                stream_name: std::env::var("QUEUE_STREAM").unwrap_or(redis_defaults.stream_name),
                consumer_group: std::env::var("QUEUE_CONSUMER_GROUP")
                    .unwrap_or(redis_defaults.consumer_group),
                consumer_name: redis_defaults.consumer_name,
                lease: Duration::from_secs(lease_secs),
            },
        })
    }

    /// Check settings needed by the selected backend.
    pub fn validate(&self) -> QueueResult<()> {
        match self.backend {
            QueueBackend::Sqs => {
                if self.sqs.queue_url.trim().is_empty() {
                    return Err(QueueError::config("SQS_QUEUE_URL"));
                }
                // A custom endpoint serves its own URL shape
                if self.sqs.endpoint_url.is_none() && !is_valid_sqs_url(&self.sqs.queue_url) {
                    return Err(QueueError::config(format!(
                        "Invalid SQS Queue URL format: {}",
                        self.sqs.queue_url
                    )));
                }
            }
            QueueBackend::Redis => {
                if Url::parse(&self.redis.redis_url).is_err() {
                    return Err(QueueError::config(format!(
                        "Invalid Redis URL: {}",
                        self.redis.redis_url
                    )));
                }
            }
        }
        Ok(())
    }
}

/// `https://sqs.{region}.amazonaws.com/{account_id}/{queue_name}`
pub fn is_valid_sqs_url(raw: &str) -> bool {
    let Ok(url) = Url::parse(raw) else {
        return false;
    };
    let host_ok = url
        .host_str()
        .map(|h| h.starts_with("sqs.") && h.ends_with(".amazonaws.com"))
        .unwrap_or(false);
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    url.scheme() == "https"
        && host_ok
        && segments.len() == 2
        && segments[0].chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_sqs_url_validation() {
        assert!(is_valid_sqs_url(
            "https://sqs.ap-northeast-2.amazonaws.com/123456789012/test-queue"
        ));
        assert!(!is_valid_sqs_url("https://invalid-url.com/queue"));
        assert!(!is_valid_sqs_url("http://sqs.us-west-2.amazonaws.com/123/q"));
        assert!(!is_valid_sqs_url("https://sqs.us-west-2.amazonaws.com/q"));
        assert!(!is_valid_sqs_url("not a url"));
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!("SQS".parse::<QueueBackend>().unwrap(), QueueBackend::Sqs);
        assert_eq!("redis".parse::<QueueBackend>().unwrap(), QueueBackend::Redis);
        assert!("kafka".parse::<QueueBackend>().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        for var in [
            "QUEUE_BACKEND",
            "SQS_QUEUE_URL",
            "SQS_WAIT_TIME_SECONDS",
            "SQS_VISIBILITY_TIMEOUT_SECONDS",
            "SQS_ENDPOINT_URL",
            "REDIS_URL",
            "QUEUE_STREAM",
            "QUEUE_CONSUMER_GROUP",
        ] {
            std::env::remove_var(var);
        }

        let config = QueueConfig::from_env().unwrap();
        assert_eq!(config.backend, QueueBackend::Sqs);
        assert_eq!(config.sqs.wait_time, Duration::from_secs(10));
        assert_eq!(config.sqs.visibility_timeout, Duration::from_secs(90));
        assert_eq!(config.redis.stream_name, "vsum:jobs");
        assert_eq!(config.redis.lease, Duration::from_secs(90));
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_sqs() {
        std::env::set_var("QUEUE_BACKEND", "sqs");
        std::env::set_var(
            "SQS_QUEUE_URL",
            "https://sqs.ap-northeast-2.amazonaws.com/123456789012/test-queue",
        );
        std::env::set_var("SQS_VISIBILITY_TIMEOUT_SECONDS", "300");

        let config = QueueConfig::from_env().unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.sqs.visibility_timeout, Duration::from_secs(300));

        std::env::remove_var("QUEUE_BACKEND");
        std::env::remove_var("SQS_QUEUE_URL");
        std::env::remove_var("SQS_VISIBILITY_TIMEOUT_SECONDS");
    }

    #[test]
    #[serial]
    fn test_from_env_unknown_backend() {
        std::env::set_var("QUEUE_BACKEND", "rabbitmq");
        assert!(QueueConfig::from_env().is_err());
        std::env::remove_var("QUEUE_BACKEND");
    }
}
