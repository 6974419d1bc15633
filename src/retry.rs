use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Backoff applied to source strings whose translation batch failed.
///
/// With a zero `initial_delay` the guard is disabled and a failed string is
/// eligible again on the very next request.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Delay after the first failure
    pub initial_delay: Duration,
    /// Maximum delay between attempts
    pub max_delay: Duration,
    /// Multiplier for exponential backoff (e.g., 2.0 doubles the delay each time)
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Create a new retry configuration
    pub fn new(initial_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }

    /// No backoff: failed strings are retried immediately.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Set the maximum delay between attempts
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Set the backoff multiplier
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn is_enabled(&self) -> bool {
        !self.initial_delay.is_zero()
    }

    /// Calculate the cool-down after `failures` consecutive failures (1-indexed)
    pub fn delay_for_failure(&self, failures: u32) -> Duration {
        if failures == 0 || !self.is_enabled() {
            return Duration::ZERO;
        }

        let delay_ms = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi((failures - 1) as i32);

        let delay = Duration::from_millis(delay_ms as u64);
        delay.min(self.max_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

#[derive(Debug, Clone)]
struct FailureRecord {
    failures: u32,
    retry_at: Instant,
}

/// Failed source strings of one language activation and when each may be
/// requested again.
#[derive(Debug, Default)]
pub struct FailureLog {
    records: HashMap<String, FailureRecord>,
}

impl FailureLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failed batch. No-op when the guard is disabled.
    pub fn record_failure(&mut self, texts: &[String], config: &RetryConfig, now: Instant) {
        if !config.is_enabled() {
            return;
        }

        for text in texts {
            let record = self.records.entry(text.clone()).or_insert(FailureRecord {
                failures: 0,
                retry_at: now,
            });
            record.failures = record.failures.saturating_add(1);
            let delay = config.delay_for_failure(record.failures);
            record.retry_at = now + delay;
            debug!(
                "'{}' failed {} time(s), next attempt in {:?}",
                text, record.failures, delay
            );
        }
    }

    /// Whether `text` is still inside its cool-down window.
    pub fn is_cooling_down(&self, text: &str, now: Instant) -> bool {
        self.records
            .get(text)
            .map(|record| now < record.retry_at)
            .unwrap_or(false)
    }

    pub fn clear(&mut self, text: &str) {
        self.records.remove(text);
    }
}
