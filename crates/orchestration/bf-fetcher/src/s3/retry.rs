//! Retry logic for S3 requests.
//!
//! Listing pages and `GetObject` calls are retried with exponential backoff
//! and jitter when the error looks transient. Authentication failures and
//! missing buckets or keys fail immediately.

use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries before giving up.
    pub max_retries: u32,
    /// Initial backoff duration in milliseconds.
    pub initial_backoff_ms: u64,
    /// Maximum backoff duration in milliseconds.
    pub max_backoff_ms: u64,
    /// Whether to add jitter to backoff times.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 200,
            max_backoff_ms: 10_000,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// A configuration that never retries.
    pub fn disabled() -> Self {
        Self::default().with_max_retries(0)
    }

    /// Set the maximum number of retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the initial backoff in milliseconds.
    pub fn with_initial_backoff_ms(mut self, initial_backoff_ms: u64) -> Self {
        self.initial_backoff_ms = initial_backoff_ms;
        self
    }

    /// Set the maximum backoff in milliseconds.
    pub fn with_max_backoff_ms(mut self, max_backoff_ms: u64) -> Self {
        self.max_backoff_ms = max_backoff_ms;
        self
    }

    /// Enable or disable jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Calculate the backoff duration for a given attempt.
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        let base_ms = self
            .initial_backoff_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        let capped_ms = base_ms.min(self.max_backoff_ms);

        let final_ms = if self.jitter {
            let jitter_range = capped_ms / 4;
            let jitter = rand::rng().random_range(0..=jitter_range);
            capped_ms.saturating_add(jitter)
        } else {
            capped_ms
        };

        Duration::from_millis(final_ms)
    }
}

/// Error classification for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClassification {
    /// The error is transient and can be retried.
    Retryable,
    /// The error is permanent and should not be retried.
    NonRetryable,
}

/// Classify an S3 error message for retry purposes.
///
/// Permanent conditions are checked first so that a message such as
/// "AccessDenied ... (status 403)" is never retried even if it also
/// mentions a timeout.
pub fn classify_error(error: &str) -> ErrorClassification {
    let error_lower = error.to_lowercase();

    const PERMANENT: &[&str] = &[
        "nosuchbucket",
        "nosuchkey",
        "accessdenied",
        "invalidaccesskeyid",
        "signaturedoesnotmatch",
        "invalidbucketname",
        "invalidrequest",
        "status code: 400",
        "status code: 401",
        "status code: 403",
        "status code: 404",
        " 403 ",
        " 404 ",
    ];

    const TRANSIENT: &[&str] = &[
        "slowdown",
        "toomanyrequests",
        "throttl",
        "service unavailable",
        "internalerror",
        "500",
        "502",
        "503",
        "504",
        "timeout",
        "timed out",
        "dispatch failure",
        "connection reset",
        "connection refused",
        "broken pipe",
    ];

    if PERMANENT.iter().any(|needle| error_lower.contains(needle)) {
        return ErrorClassification::NonRetryable;
    }

    if TRANSIENT.iter().any(|needle| error_lower.contains(needle)) {
        return ErrorClassification::Retryable;
    }

    // Unknown errors get the benefit of the doubt
    ErrorClassification::Retryable
}

/// Execute an async operation with retry logic.
///
/// The operation is invoked at most `max_retries + 1` times. The last error
/// is returned when every attempt failed.
pub async fn with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        let error = match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        if classify_error(&error.to_string()) == ErrorClassification::NonRetryable {
            warn!(
                operation = operation_name,
                attempt,
                error = %error,
                "Non-retryable error"
            );
            return Err(error);
        }

        if attempt >= config.max_retries {
            warn!(
                operation = operation_name,
                attempt,
                error = %error,
                "Retries exhausted"
            );
            return Err(error);
        }

        let backoff = config.backoff_duration(attempt);
        warn!(
            operation = operation_name,
            attempt,
            error = %error,
            backoff_ms = backoff.as_millis() as u64,
            "Retryable error, backing off"
        );
        sleep(backoff).await;
        attempt += 1;
    }
}
