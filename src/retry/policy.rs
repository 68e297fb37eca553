//! Retry policy
//!
//! Bounded exponential backoff over classified errors. Only kinds marked
//! retryable (rate limiting, network) are retried.

use std::sync::Arc;
use std::time::Duration;

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};

use crate::error::ClassifiedError;

/// Details of a scheduled retry, passed to [`RetryPolicy::with_on_retry`] hooks.
#[derive(Debug, Clone)]
pub struct RetryAttempt {
    /// 1-based number of the retry about to happen.
    pub attempt: u32,
    pub delay: Duration,
    pub error: ClassifiedError,
}

pub type RetryCallback = Arc<dyn Fn(&RetryAttempt) + Send + Sync>;

/// Retry policy configuration
#[derive(Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt; `0` disables retrying.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Jitter, as a fraction of each delay (0.0 to 1.0).
    pub randomization_factor: f64,
    /// Custom retry condition; replaces the error's own `retryable` flag.
    pub retry_condition: Option<fn(&ClassifiedError) -> bool>,
    on_retry: Option<RetryCallback>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            randomization_factor: 0.1,
            retry_condition: None,
            on_retry: None,
        }
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("initial_delay", &self.initial_delay)
            .field("max_delay", &self.max_delay)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("randomization_factor", &self.randomization_factor)
            .field("retry_condition", &self.retry_condition.is_some())
            .field("on_retry", &self.on_retry.is_some())
            .finish()
    }
}

impl RetryPolicy {
    /// Create a policy with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::default().with_max_retries(0)
    }

    /// Set maximum retries
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set initial delay
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set maximum delay
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set backoff multiplier
    pub const fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Set jitter factor, clamped to `0.0..=1.0`
    pub const fn with_randomization_factor(mut self, factor: f64) -> Self {
        self.randomization_factor = factor.clamp(0.0, 1.0);
        self
    }

    /// Set a custom retry condition, replacing the `retryable` flag
    pub fn with_retry_condition(mut self, condition: fn(&ClassifiedError) -> bool) -> Self {
        self.retry_condition = Some(condition);
        self
    }

    /// Hook invoked right before each backoff sleep.
    pub fn with_on_retry<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RetryAttempt) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(callback));
        self
    }

    /// Whether `error` may be retried after `retries_so_far` retries.
    pub fn should_retry(&self, error: &ClassifiedError, retries_so_far: u32) -> bool {
        if retries_so_far >= self.max_retries {
            return false;
        }
        match self.retry_condition {
            Some(condition) => condition(error),
            None => error.retryable,
        }
    }

    /// Fresh backoff schedule for one operation.
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_delay)
            .with_max_interval(self.max_delay)
            .with_multiplier(self.backoff_multiplier)
            .with_randomization_factor(self.randomization_factor)
            .with_max_elapsed_time(None)
            .build()
    }

    pub(crate) fn notify(&self, attempt: &RetryAttempt) {
        if let Some(callback) = &self.on_retry {
            callback(attempt);
        }
    }
}
