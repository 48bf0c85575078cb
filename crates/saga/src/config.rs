//! Saga timing and retry settings.

use std::time::Duration;

use backon::ExponentialBuilder;

/// Longest single wait between retry attempts.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Bounded exponential retry for compensating writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included. At least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles on each further attempt.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// A single attempt, no retry.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Longest wait the schedule can reach, capped at [`MAX_RETRY_DELAY`].
    pub fn max_delay(&self) -> Duration {
        2u32.checked_pow(self.max_attempts)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(MAX_RETRY_DELAY, |delay| delay.min(MAX_RETRY_DELAY))
    }

    /// Backoff schedule for `backon`.
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay.min(MAX_RETRY_DELAY))
            .with_max_delay(self.max_delay())
            .with_factor(2.0)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(100))
    }
}

/// Settings shared by both orchestrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SagaConfig {
    /// Deadline applied to every upstream call.
    pub call_timeout: Duration,
    /// Retry for compensating writes (booking revert, cancellation release).
    pub retry: RetryPolicy,
}

impl SagaConfig {
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for SagaConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(3),
            retry: RetryPolicy::default(),
        }
    }
}
