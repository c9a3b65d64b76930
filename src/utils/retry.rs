//! Retry with exponential backoff for archive and document downloads.

use std::time::Duration;
use tokio::time::{sleep, timeout};

use crate::sources::SourceError;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Maximum total time to spend on retries (including delays)
    pub max_total_time: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            max_total_time: Duration::from_secs(120),
        }
    }
}

impl RetryConfig {
    /// Single attempt, no backoff
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return self.initial_delay;
        }
        let secs = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powf(attempt as f64 - 1.0);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }
}

/// Transient errors that should trigger a retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientError {
    Network,
    RateLimit,
    Timeout,
}

impl TransientError {
    /// Classify a [`SourceError`]; `None` means permanent
    pub fn from_source_error(err: &SourceError) -> Option<Self> {
        match err {
            SourceError::RateLimit => Some(TransientError::RateLimit),
            SourceError::Network(msg) if msg.to_lowercase().contains("timed out") => {
                Some(TransientError::Timeout)
            }
            SourceError::Network(_) => Some(TransientError::Network),
            _ => None,
        }
    }

    /// Lower bound on the wait before the next attempt
    pub fn recommended_delay(&self) -> Duration {
        match self {
            TransientError::RateLimit => Duration::from_secs(10),
            TransientError::Timeout | TransientError::Network => Duration::ZERO,
        }
    }
}

/// Execute an async operation, retrying transient failures.
///
/// Permanent errors (not found, parse, archive) return immediately.
pub async fn with_retry<T, F, Fut>(config: RetryConfig, mut operation: F) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, SourceError>>,
{
    let mut attempts = 0;
    let mut total_elapsed = Duration::ZERO;

    loop {
        attempts += 1;

        let error = match timeout(config.max_total_time, operation()).await {
            Ok(Ok(result)) => {
                if attempts > 1 {
                    tracing::info!("Operation succeeded on attempt {}", attempts);
                }
                return Ok(result);
            }
            Ok(Err(error)) => error,
            Err(_) => SourceError::Network("operation timed out".to_string()),
        };

        let Some(transient) = TransientError::from_source_error(&error) else {
            return Err(error);
        };

        let delay = std::cmp::max(config.delay_for(attempts), transient.recommended_delay());
        total_elapsed += delay;

        if attempts >= config.max_attempts || total_elapsed >= config.max_total_time {
            tracing::warn!(
                "Operation failed after {} attempts (total elapsed: {:?}): {}",
                attempts,
                total_elapsed,
                error
            );
            return Err(error);
        }

        tracing::debug!(
            "Transient error on attempt {}: {:?}, retrying in {:?}",
            attempts,
            transient,
            delay
        );
        sleep(delay).await;
    }
}
