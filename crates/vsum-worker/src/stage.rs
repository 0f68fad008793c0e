//! Running one processing stage under a retry and fallback policy.
//!
//! A [`StagePolicy`] names a primary strategy, how many times to try it and
//! an ordered list of fallback strategies. [`StageExecutor::run`] tries the
//! primary up to `max_attempts` times with exponential backoff in between,
//! then each fallback exactly once, and classifies the last failure.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};
use vsum_ai_client::AiError;
use vsum_media::MediaError;
use vsum_models::{StageName, StageResult};
use vsum_storage::StorageError;

use crate::classifier::classify;
use crate::metrics;

/// What kind of failure a collaborator reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureSignal {
    /// The service did not answer in time, or asked us to slow down
    Timeout,
    /// The service answered with something unusable
    BadResponse,
    /// Anything else
    Other,
}

/// A single failed attempt, as seen by the executor.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct StageError {
    pub signal: FailureSignal,
    pub message: String,
    /// Whether repeating the same strategy could succeed
    pub retryable: bool,
}

impl StageError {
    pub fn new(signal: FailureSignal, message: impl Into<String>) -> Self {
        Self {
            signal,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FailureSignal::Timeout, message)
    }

    pub fn bad_response(message: impl Into<String>) -> Self {
        Self::new(FailureSignal::BadResponse, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(FailureSignal::Other, message)
    }

    /// Mark as not worth repeating with the same strategy.
    pub fn permanent(mut self) -> Self {
        self.retryable = false;
        self
    }
}

impl From<MediaError> for StageError {
    fn from(err: MediaError) -> Self {
        let signal = match err {
            MediaError::Timeout(_) => FailureSignal::Timeout,
            MediaError::InvalidAudio(_) => FailureSignal::BadResponse,
            _ => FailureSignal::Other,
        };
        let message = match err.stderr() {
            Some(stderr) if !stderr.is_empty() => format!("{}: {}", err, stderr.trim()),
            _ => err.to_string(),
        };
        Self {
            signal,
            message,
            retryable: err.is_retryable(),
        }
    }
}

impl From<StorageError> for StageError {
    fn from(err: StorageError) -> Self {
        Self {
            signal: FailureSignal::Other,
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

impl From<AiError> for StageError {
    fn from(err: AiError) -> Self {
        let signal = if err.is_timeout() {
            FailureSignal::Timeout
        } else {
            FailureSignal::BadResponse
        };
        Self {
            signal,
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

impl From<std::io::Error> for StageError {
    fn from(err: std::io::Error) -> Self {
        Self::other(err.to_string())
    }
}

/// Exponential backoff between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// No waiting between attempts.
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Wait after the `k`-th consecutive failure (1-based): `base * 2^(k-1)`,
    /// capped at `max`.
    pub fn delay_for_attempt(&self, k: u32) -> Duration {
        let exponent = k.saturating_sub(1).min(31);
        self.base.saturating_mul(2u32.pow(exponent)).min(self.max)
    }
}

/// How a stage is attempted.
#[derive(Debug, Clone)]
pub struct StagePolicy<S> {
    pub max_attempts: u32,
    pub backoff: Backoff,
    pub primary: S,
    /// Tried once each, in order, after the primary is exhausted
    pub fallback_chain: Vec<S>,
}

impl<S> StagePolicy<S> {
    pub fn new(primary: S, max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            primary,
            fallback_chain: Vec::new(),
        }
    }

    /// One attempt, no fallbacks, no backoff.
    pub fn single_attempt(primary: S) -> Self {
        Self::new(primary, 1, Backoff::none())
    }

    pub fn with_fallbacks(mut self, chain: impl IntoIterator<Item = S>) -> Self {
        self.fallback_chain = chain.into_iter().collect();
        self
    }

    /// Upper bound on action invocations under this policy.
    pub fn max_invocations(&self) -> u32 {
        self.max_attempts + self.fallback_chain.len() as u32
    }
}

/// Runs stage actions under a [`StagePolicy`].
///
/// Holds no state; the executor never touches the job context.
#[derive(Debug, Clone, Copy, Default)]
pub struct StageExecutor;

impl StageExecutor {
    /// Run `action` for `stage` until it succeeds or the policy is exhausted.
    ///
    /// `action` receives the strategy to use for each invocation. A failure
    /// marked non-retryable ends the current strategy early; fallbacks are
    /// still tried.
    pub async fn run<S, T, F, Fut>(
        stage: StageName,
        policy: &StagePolicy<S>,
        mut action: F,
    ) -> StageResult<T>
    where
        S: Clone + fmt::Debug,
        F: FnMut(S) -> Fut,
        Fut: Future<Output = Result<T, StageError>>,
    {
        let mut last_error: Option<StageError> = None;

        for attempt in 1..=policy.max_attempts {
            match action(policy.primary.clone()).await {
                Ok(value) => {
                    metrics::record_stage_attempt(stage, true);
                    return StageResult::Success(value);
                }
                Err(e) => {
                    metrics::record_stage_attempt(stage, false);
                    warn!(
                        stage = %stage,
                        attempt,
                        max_attempts = policy.max_attempts,
                        strategy = ?policy.primary,
                        retryable = e.retryable,
                        "Stage attempt failed: {}", e
                    );
                    let retryable = e.retryable;
                    last_error = Some(e);

                    if !retryable {
                        break;
                    }
                    if attempt < policy.max_attempts {
                        let delay = policy.backoff.delay_for_attempt(attempt);
                        debug!(stage = %stage, "Retrying in {:?}", delay);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        for strategy in &policy.fallback_chain {
            debug!(stage = %stage, strategy = ?strategy, "Trying fallback strategy");
            match action(strategy.clone()).await {
                Ok(value) => {
                    metrics::record_stage_attempt(stage, true);
                    return StageResult::Success(value);
                }
                Err(e) => {
                    metrics::record_stage_attempt(stage, false);
                    warn!(stage = %stage, strategy = ?strategy, "Fallback failed: {}", e);
                    last_error = Some(e);
                }
            }
        }

        let error = last_error.unwrap_or_else(|| StageError::other("stage never ran"));
        StageResult::failure(classify(stage, &error), error.message)
    }
}
