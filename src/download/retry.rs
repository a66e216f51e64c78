//! Escalating-timeout retry policy for fetch attempts.
//!
//! This module provides the [`RetryPolicy`] and [`FailureType`] types for
//! classifying fetch errors and determining retry behavior.
//!
//! # Overview
//!
//! Each attempt runs under its own timeout, taken in order from a fixed list
//! (1s, 2s, 3s, 5s, 7s by default). A failed attempt is followed immediately
//! by the next one with the next, longer timeout; there is no idle delay and
//! no jitter. The failures this guards against are slow servers, not
//! congestion, so the only thing that grows is patience.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use distfetch_core::download::{FetchError, RetryDecision, RetryPolicy, classify_error};
//!
//! let policy = RetryPolicy::default();
//! let error = FetchError::http_status("https://example.com/debian.csv", 503);
//!
//! match policy.should_retry(classify_error(&error), 1) {
//!     RetryDecision::Retry { timeout, attempt } => {
//!         assert_eq!(timeout, Duration::from_secs(2));
//!         assert_eq!(attempt, 2);
//!     }
//!     RetryDecision::DoNotRetry { reason } => panic!("unexpected: {reason}"),
//! }
//! ```

use std::time::Duration;

use tracing::{debug, instrument};

use super::FetchError;
use super::constants::DEFAULT_ATTEMPT_TIMEOUTS;

/// Default maximum attempts (length of the default timeout ladder).
pub const DEFAULT_MAX_ATTEMPTS: u32 = DEFAULT_ATTEMPT_TIMEOUTS.len() as u32;

/// Classification of fetch failure types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Failure that a later, more patient attempt may get past.
    ///
    /// Examples: timeout, connection refused, 5xx, truncated body.
    Transient,

    /// Failure that no attempt will get past.
    ///
    /// Example: a malformed URL.
    Permanent,
}

/// Decision on whether to retry a failed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Start the next attempt immediately with this timeout.
    Retry {
        /// Timeout for the next attempt.
        timeout: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry; the last error is final.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Fixed sequence of per-attempt timeouts.
///
/// # Default Values
///
/// `[1s, 2s, 3s, 5s, 7s]`: five attempts, about 18 seconds of total patience.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Timeout of each attempt, in order. Never empty.
    timeouts: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeouts: DEFAULT_ATTEMPT_TIMEOUTS.to_vec(),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy from an explicit timeout ladder.
    ///
    /// An empty ladder falls back to the default one.
    #[must_use]
    pub fn new(timeouts: Vec<Duration>) -> Self {
        if timeouts.is_empty() {
            return Self::default();
        }
        Self { timeouts }
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn max_attempts(&self) -> u32 {
        self.timeouts.len() as u32
    }

    /// Returns the configured timeouts in attempt order.
    #[must_use]
    pub fn timeouts(&self) -> &[Duration] {
        &self.timeouts
    }

    /// Returns the timeout of the first attempt.
    #[must_use]
    pub fn first_timeout(&self) -> Duration {
        self.timeouts
            .first()
            .copied()
            .unwrap_or(DEFAULT_ATTEMPT_TIMEOUTS[0])
    }

    /// Returns the timeout for a 1-indexed attempt, if within budget.
    #[must_use]
    pub fn timeout_for(&self, attempt: u32) -> Option<Duration> {
        let index = usize::try_from(attempt.checked_sub(1)?).ok()?;
        self.timeouts.get(index).copied()
    }

    /// Determines whether to retry after `attempt` (1-indexed) failed.
    #[instrument(skip(self), fields(max_attempts = self.max_attempts()))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        let next = attempt.saturating_add(1);
        match self.timeout_for(next) {
            Some(timeout) => {
                debug!(
                    attempt,
                    next_attempt = next,
                    timeout_ms = timeout.as_millis(),
                    "will retry"
                );
                RetryDecision::Retry {
                    timeout,
                    attempt: next,
                }
            }
            None => {
                debug!(attempt, max = self.max_attempts(), "max attempts reached");
                RetryDecision::DoNotRetry {
                    reason: format!("max attempts ({}) exhausted", self.max_attempts()),
                }
            }
        }
    }
}

/// Classifies a fetch error into a failure type for retry decisions.
///
/// Everything the network can throw at us is retried, including error
/// statuses; only a URL that cannot be parsed is permanent.
#[must_use]
pub fn classify_error(error: &FetchError) -> FailureType {
    match error {
        FetchError::InvalidUrl { .. } => FailureType::Permanent,
        FetchError::Network { .. } | FetchError::Timeout { .. } | FetchError::HttpStatus { .. } => {
            FailureType::Transient
        }
    }
}
