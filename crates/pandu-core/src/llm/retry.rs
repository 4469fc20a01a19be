//! Bounded retry with linear backoff for transient provider failures.

use crate::error::{PanduError, PanduResult};
use crate::llm::provider_types::{Completion, ErrorClass, ProviderError, ProviderKind};
use serde::Deserialize;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Retry tunables. Defaults match production behavior; tests shrink the
/// delays instead of mocking time.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub max_attempts: u32,
    /// Attempt `i` waits `i * base_delay` before the next try.
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    /// Fresh budget for every attempt; an elapsed timeout is transient.
    #[serde(with = "humantime_serde")]
    pub attempt_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    pub fn validate(&self) -> PanduResult<()> {
        if self.max_attempts == 0 {
            return Err(PanduError::config("retry.max_attempts must be at least 1"));
        }
        if self.attempt_timeout.is_zero() {
            return Err(PanduError::config("retry.attempt_timeout must be non-zero"));
        }
        Ok(())
    }
}

/// Terminal failure of a retried operation.
#[derive(Debug, Clone)]
pub struct RetryFailure {
    pub error: ProviderError,
    /// Attempts actually executed before giving up.
    pub attempts: u32,
    /// The overall deadline ran out before the attempt budget did.
    pub deadline_hit: bool,
}

/// Runs one provider's call up to `max_attempts` times.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Execute `operation` until it succeeds, fails permanently, the attempt
    /// budget is spent, or `deadline` passes.
    ///
    /// Every attempt runs under `attempt_timeout`, shrunk to whatever remains
    /// of the deadline; an elapsed timeout counts as one transient failure,
    /// never an unhandled fault. The deadline is re-checked before every
    /// attempt and every backoff sleep, so an expired budget stops the loop
    /// instead of funding further full-length attempts. After failed attempt
    /// `i` the policy sleeps `i * base_delay` when another attempt remains.
    /// Cancellation aborts the in-flight attempt and any backoff sleep
    /// immediately.
    pub async fn run<F, Fut>(
        &self,
        provider: ProviderKind,
        deadline: Option<Instant>,
        cancel: &CancellationToken,
        operation: F,
    ) -> Result<Completion, RetryFailure>
    where
        F: Fn(u32) -> Fut,
        Fut: Future<Output = Result<Completion, ProviderError>>,
    {
        let max_attempts = self.config.max_attempts;
        let mut last_error = ProviderError::transient("no attempts executed");

        for attempt in 1..=max_attempts {
            let Some(attempt_timeout) = self.attempt_budget(deadline) else {
                return Err(RetryFailure {
                    error: last_error,
                    attempts: attempt - 1,
                    deadline_hit: true,
                });
            };

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(RetryFailure {
                        error: ProviderError::cancelled(),
                        attempts: attempt - 1,
                        deadline_hit: false,
                    });
                }
                outcome = timeout(attempt_timeout, operation(attempt)) => outcome,
            };

            let error = match outcome {
                Ok(Ok(completion)) => {
                    debug!(provider = %provider, attempt, "provider call succeeded");
                    return Ok(completion);
                }
                Ok(Err(error)) => error,
                Err(_) => ProviderError::transient(format!(
                    "{provider} attempt timed out after {attempt_timeout:?}"
                )),
            };

            match error.class {
                ErrorClass::Cancelled => {
                    return Err(RetryFailure { error, attempts: attempt, deadline_hit: false });
                }
                ErrorClass::Permanent => {
                    debug!(provider = %provider, attempt, error = %error, "permanent provider failure, not retrying");
                    return Err(RetryFailure { error, attempts: attempt, deadline_hit: false });
                }
                ErrorClass::Transient => {}
            }

            warn!(
                provider = %provider,
                attempt,
                max_attempts,
                error = %error,
                "transient provider failure"
            );
            last_error = error;

            if attempt < max_attempts {
                let delay = self.config.base_delay * attempt;
                if deadline.is_some_and(|deadline| Instant::now() + delay >= deadline) {
                    return Err(RetryFailure {
                        error: last_error,
                        attempts: attempt,
                        deadline_hit: true,
                    });
                }
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        return Err(RetryFailure {
                            error: ProviderError::cancelled(),
                            attempts: attempt,
                            deadline_hit: false,
                        });
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        Err(RetryFailure {
            error: last_error,
            attempts: max_attempts,
            deadline_hit: false,
        })
    }

    /// Per-attempt timeout shrunk to the remaining overall budget.
    /// `None` means the deadline already passed.
    fn attempt_budget(&self, deadline: Option<Instant>) -> Option<Duration> {
        let configured = self.config.attempt_timeout;
        match deadline {
            None => Some(configured),
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    None
                } else {
                    Some(remaining.min(configured))
                }
            }
        }
    }
}
