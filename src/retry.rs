//! Retry logic for source requests
//!
//! Every source request is a read-only GET, so any transient failure can be retried
//! safely. Attempts are strictly sequential: the next attempt starts only after the
//! previous one failed and the inter-attempt delay elapsed.
//!
//! # Example
//!
//! ```no_run
//! use env_migrate::config::RetryConfig;
//! use env_migrate::retry::{IsRetryable, retry_with_backoff};
//!
//! #[derive(Debug)]
//! struct Flaky;
//!
//! impl std::fmt::Display for Flaky {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "flaky")
//!     }
//! }
//!
//! impl IsRetryable for Flaky {
//!     fn is_retryable(&self) -> bool {
//!         true
//!     }
//! }
//!
//! # async fn example() {
//! let config = RetryConfig::default();
//! let result = retry_with_backoff(&config, || async { Ok::<_, Flaky>(42) }).await;
//! assert_eq!(result.ok(), Some(42));
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::FetchError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            // A malformed URL fails the same way on every attempt
            FetchError::InvalidUrl(_) => false,
            // Error statuses are retried too, even when they carry a JSON error body
            FetchError::Timeout(_)
            | FetchError::Transport(_)
            | FetchError::Status { .. }
            | FetchError::Decode(_) => true,
        }
    }
}

/// The final error of an operation that gave up, with the number of attempts made
#[derive(Debug)]
pub struct Exhausted<E> {
    /// Error returned by the last attempt
    pub error: E,
    /// Total attempts made, including the first
    pub attempts: u32,
}

/// Execute an async operation, retrying transient failures
///
/// `config.max_attempts` is the total number of attempts including the first one.
/// A value of 0 is treated as 1. Between attempts the task sleeps `retry_delay`,
/// multiplied by `backoff_multiplier` after every retry and capped at `max_delay`.
pub async fn retry_with_backoff<F, Fut, T, E>(
    config: &RetryConfig,
    mut operation: F,
) -> Result<T, Exhausted<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;
    let mut delay = config.retry_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "Request succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let wait = if config.jitter { add_jitter(delay) } else { delay };

                tracing::warn!(
                    error = %e,
                    attempt,
                    max_attempts,
                    delay_ms = wait.as_millis(),
                    "Request failed, retrying"
                );

                tokio::time::sleep(wait).await;

                attempt += 1;
                delay = next_delay(delay, config);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt,
                        "Request failed after all attempts exhausted"
                    );
                } else {
                    tracing::error!(error = %e, "Request failed with non-retryable error");
                }
                return Err(Exhausted {
                    error: e,
                    attempts: attempt,
                });
            }
        }
    }
}

/// The delay after `delay`, capped at `max_delay`
///
/// A product that is not representable as a [`Duration`] (overflow, negative or NaN
/// multiplier) saturates to `max_delay`.
fn next_delay(delay: Duration, config: &RetryConfig) -> Duration {
    Duration::try_from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier)
        .unwrap_or(config.max_delay)
        .min(config.max_delay)
}

/// Stretch a delay by a uniformly random 0-100%
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::try_from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor)).unwrap_or(delay)
}
