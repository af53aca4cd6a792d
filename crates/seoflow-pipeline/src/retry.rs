//! Bounded retries with parameter relaxation.

use std::future::Future;
use std::time::Duration;

use seoflow_core::ErrorKind;

use crate::{PipelineError, PipelineResult, TRACING_TARGET};

/// Parameters that can be loosened after a failed attempt.
///
/// Each retry runs with the parameters returned by [`relax`], so a retry is
/// never a blind repeat of the call that just failed.
///
/// [`relax`]: Relax::relax
pub trait Relax: Clone {
    /// Returns the parameters for the attempt after `attempt` failed with `error`.
    fn relax(&self, error: &PipelineError, attempt: u32) -> Self;
}

/// Retry policy for pipeline operations.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries (0 means a single attempt).
    pub max_retries: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Error kinds that are retried; everything else fails immediately.
    pub retry_on: Vec<ErrorKind>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            retry_on: vec![ErrorKind::GenerationFailed, ErrorKind::StyleViolationUnresolved],
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy retrying the given error kinds.
    pub fn new(max_retries: u32, initial_backoff: Duration, retry_on: Vec<ErrorKind>) -> Self {
        Self {
            max_retries,
            initial_backoff,
            retry_on,
            ..Self::default()
        }
    }

    /// Create a policy with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            backoff_multiplier: 1.0,
            retry_on: Vec::new(),
        }
    }

    /// Set the maximum backoff duration.
    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Returns whether an error is retried under this policy.
    pub fn should_retry(&self, error: &PipelineError) -> bool {
        self.retry_on.contains(&error.kind())
    }

    /// Calculate the backoff duration for a given attempt number.
    fn calculate_backoff(&self, attempt: u32) -> Duration {
        let backoff_millis = (self.initial_backoff.as_millis() as f64)
            * self.backoff_multiplier.powi(attempt as i32);
        let backoff = Duration::from_millis(backoff_millis as u64);
        backoff.min(self.max_backoff)
    }

    /// Runs `operation`, retrying retryable failures with relaxed parameters.
    ///
    /// The operation receives the parameters for the attempt and the
    /// zero-based attempt number. The error of the final attempt is returned
    /// when every attempt fails.
    pub async fn execute<P, F, Fut, T>(&self, params: P, mut operation: F) -> PipelineResult<T>
    where
        P: Relax,
        F: FnMut(P, u32) -> Fut,
        Fut: Future<Output = PipelineResult<T>>,
    {
        let mut params = params;
        let mut attempt = 0;

        loop {
            let error = match operation(params.clone(), attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !self.should_retry(&error) {
                tracing::debug!(
                    target: TRACING_TARGET,
                    error = %error,
                    "Non-retryable error, failing immediately"
                );
                return Err(error);
            }

            if attempt >= self.max_retries {
                tracing::debug!(
                    target: TRACING_TARGET,
                    attempts = attempt + 1,
                    error = %error,
                    "Retry attempts exhausted"
                );
                return Err(error);
            }

            let backoff = self.calculate_backoff(attempt);
            tracing::debug!(
                target: TRACING_TARGET,
                attempt = attempt + 1,
                max_retries = self.max_retries,
                backoff_ms = backoff.as_millis(),
                error_kind = error.kind().as_ref(),
                "Retrying with relaxed parameters"
            );

            params = params.relax(&error, attempt);
            if !backoff.is_zero() {
                tokio::time::sleep(backoff).await;
            }
            attempt += 1;
        }
    }
}
