//! Retry classification and backoff for transport requests.
//!
//! # Overview
//!
//! Every failed attempt is classified into a [`FailureKind`]:
//! - [`FailureKind::RateLimited`] - HTTP 429, waits `min(Retry-After, rate_limit_unit × 2^attempt)`
//! - [`FailureKind::Transient`] - timeouts, refused connections, broken bodies, waits `backoff_unit × 2^attempt`
//! - [`FailureKind::Fatal`] - any other non-2xx status or an invalid request, never retried
//!
//! [`RetryPolicy::decide`] turns a classification and a 0-based attempt number
//! into a [`RetryDecision`].
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use birdcache_core::transport::{FailureKind, RetryDecision, RetryPolicy};
//!
//! let policy = RetryPolicy::default();
//! let decision = policy.decide(FailureKind::RateLimited { retry_after: Some(Duration::from_secs(2)) }, 0);
//! assert_eq!(decision, RetryDecision::Retry { delay: Duration::from_secs(2) });
//! ```

use std::time::Duration;

use tracing::{debug, instrument};

use super::TransportError;

/// Default maximum attempts, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default unit for transient-error backoff (1 second).
const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// Default unit for rate-limit backoff (5 seconds).
const DEFAULT_RATE_LIMIT_UNIT: Duration = Duration::from_secs(5);

/// Exponent ceiling so `2^attempt` cannot overflow with silly attempt counts.
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Classification of one failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Server answered 429.
    RateLimited {
        /// Parsed `Retry-After` header, when present and valid.
        retry_after: Option<Duration>,
    },
    /// Network-level failure that may succeed on retry.
    Transient,
    /// Failure that will not change on retry.
    Fatal,
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for `delay`, then try again.
    Retry {
        /// How long to wait before the next attempt.
        delay: Duration,
    },
    /// Surface the failure to the caller.
    GiveUp {
        /// Whether the ceiling was the reason for giving up.
        exhausted: bool,
    },
}

/// Retry ceiling and backoff units.
///
/// # Default Values
///
/// - `max_attempts`: 3
/// - `backoff_unit`: 1 second
/// - `rate_limit_unit`: 5 seconds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_unit: Duration,
    rate_limit_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_unit: DEFAULT_BACKOFF_UNIT,
            rate_limit_unit: DEFAULT_RATE_LIMIT_UNIT,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with explicit units. `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, backoff_unit: Duration, rate_limit_unit: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_unit,
            rate_limit_unit,
        }
    }

    /// Creates a policy with a custom ceiling and default units.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Returns the configured ceiling.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decides whether attempt number `attempt` (0-based) should be retried.
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub fn decide(&self, kind: FailureKind, attempt: u32) -> RetryDecision {
        let delay = match kind {
            FailureKind::Fatal => return RetryDecision::GiveUp { exhausted: false },
            FailureKind::RateLimited { retry_after } => {
                let exponential = scaled(self.rate_limit_unit, attempt);
                retry_after.map_or(exponential, |header| header.min(exponential))
            }
            FailureKind::Transient => scaled(self.backoff_unit, attempt),
        };

        if attempt + 1 >= self.max_attempts {
            debug!(attempt, "retry ceiling reached");
            return RetryDecision::GiveUp { exhausted: true };
        }

        debug!(attempt, delay_ms = delay.as_millis(), "will retry");
        RetryDecision::Retry { delay }
    }
}

fn scaled(unit: Duration, attempt: u32) -> Duration {
    unit.saturating_mul(1_u32 << attempt.min(MAX_BACKOFF_EXPONENT))
}

/// Classifies a transport error that occurred before a status was available.
#[must_use]
pub fn classify_error(error: &TransportError) -> FailureKind {
    match error {
        TransportError::Timeout { .. } => FailureKind::Transient,
        TransportError::Network { source, .. } => {
            if source.is_builder() || source.is_redirect() {
                FailureKind::Fatal
            } else {
                FailureKind::Transient
            }
        }
        TransportError::HttpStatus { status: 429, .. } => {
            FailureKind::RateLimited { retry_after: None }
        }
        TransportError::HttpStatus { .. }
        | TransportError::RetriesExhausted { .. }
        | TransportError::BodyTooLarge { .. }
        | TransportError::InvalidUrl { .. }
        | TransportError::ClientBuild(_) => FailureKind::Fatal,
    }
}
