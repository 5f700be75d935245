//! Global request spacing for the shared transport.
//!
//! This module provides the [`RateLimiter`] struct which enforces a minimum,
//! jittered gap between *any* two outbound requests, regardless of which
//! worker issues them. The whole crawl targets a single site, so spacing is
//! global rather than per-domain.
//!
//! # Overview
//!
//! Each call to [`RateLimiter::acquire`] reserves the next free request slot
//! under a short-lived lock and then sleeps until that slot outside the lock.
//! The spacing between slots is `base_delay × uniform(0.7, 1.3)`.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use birdcache_core::transport::RateLimiter;
//!
//! # async fn example() {
//! let limiter = RateLimiter::new(Duration::from_millis(1500));
//!
//! // First request proceeds immediately
//! limiter.acquire().await;
//!
//! // Second request waits between 1050ms and 1950ms after the first
//! limiter.acquire().await;
//! # }
//! ```

use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use super::constants::{JITTER_CEILING, JITTER_FLOOR, MAX_RETRY_AFTER};

/// Warning threshold for cumulative server-mandated delay (60 seconds).
const CUMULATIVE_DELAY_WARNING_THRESHOLD: Duration = Duration::from_secs(60);

/// Global rate limiter shared by every worker through the transport.
///
/// `last_slot` is the one piece of cross-task shared mutable state in the
/// crate. The mutex is held only while the next slot is computed, never
/// across a sleep or a request.
#[derive(Debug)]
pub struct RateLimiter {
    /// Base spacing before jitter is applied.
    base_delay: Duration,

    /// Whether rate limiting is disabled (for `--rate-limit 0` and tests).
    disabled: bool,

    /// Start instant reserved by the most recent request.
    /// `None` means nothing has been requested yet (first request is immediate).
    last_slot: Mutex<Option<Instant>>,

    /// Cumulative server-mandated delay, in milliseconds.
    cumulative_delay_ms: AtomicU64,
}

impl RateLimiter {
    /// Creates a new rate limiter with the specified base spacing.
    #[must_use]
    #[instrument(skip_all, fields(delay_ms = base_delay.as_millis()))]
    pub fn new(base_delay: Duration) -> Self {
        debug!("creating rate limiter");
        Self {
            base_delay,
            disabled: base_delay.is_zero(),
            last_slot: Mutex::new(None),
            cumulative_delay_ms: AtomicU64::new(0),
        }
    }

    /// Creates a disabled rate limiter that applies no delays.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Returns whether rate limiting is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Returns the base spacing between requests.
    #[must_use]
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Returns the smallest spacing the jitter can produce.
    #[must_use]
    pub fn min_spacing(&self) -> Duration {
        self.base_delay.mul_f64(JITTER_FLOOR)
    }

    /// Waits until this caller is allowed to issue its request.
    ///
    /// Reserves `max(now, last_slot + spacing)` as this request's start time,
    /// releases the lock, then sleeps until the reserved instant. Concurrent
    /// callers therefore queue up one jittered spacing apart.
    pub async fn acquire(&self) {
        if self.disabled {
            return;
        }

        let slot = self.reserve_slot();
        let now = Instant::now();
        if slot > now {
            debug!(delay_ms = (slot - now).as_millis(), "applying request spacing");
            tokio::time::sleep_until(slot).await;
        }
    }

    /// Pushes the next free slot back after a server rate-limit response so
    /// every worker backs off, not only the one that saw the 429.
    pub fn record_rate_limit(&self, delay: Duration) {
        if self.disabled {
            return;
        }
        let delay = delay.min(MAX_RETRY_AFTER);
        {
            let mut guard = self.last_slot.lock().unwrap_or_else(PoisonError::into_inner);
            let resume_at = Instant::now() + delay;
            *guard = Some(guard.map_or(resume_at, |last| last.max(resume_at)));
        }

        #[allow(clippy::cast_possible_truncation)]
        let delay_ms = delay.as_millis() as u64;
        let total = self
            .cumulative_delay_ms
            .fetch_add(delay_ms, Ordering::SeqCst)
            + delay_ms;
        debug!(delay_ms, cumulative_ms = total, "recorded server rate limit");
        if Duration::from_millis(total) >= CUMULATIVE_DELAY_WARNING_THRESHOLD {
            warn!(
                cumulative_delay_secs = total / 1000,
                "excessive server rate limiting - consider a larger --rate-limit"
            );
        }
    }

    fn reserve_slot(&self) -> Instant {
        let spacing = self.jittered_spacing();
        let mut guard = self.last_slot.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let slot = match *guard {
            Some(last) => (last + spacing).max(now),
            None => now,
        };
        *guard = Some(slot);
        slot
    }

    fn jittered_spacing(&self) -> Duration {
        let factor = rand::thread_rng().gen_range(JITTER_FLOOR..=JITTER_CEILING);
        self.base_delay.mul_f64(factor)
    }
}

/// Parses a Retry-After header value into a Duration.
///
/// Supports two formats as per RFC 7231:
/// - Integer seconds: `Retry-After: 120`
/// - HTTP-date: `Retry-After: Wed, 21 Oct 2025 07:28:00 GMT`
///
/// Returns `None` if the value cannot be parsed. Caps excessive values at 1 hour.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use birdcache_core::transport::parse_retry_after;
///
/// assert_eq!(parse_retry_after("2"), Some(Duration::from_secs(2)));
/// assert_eq!(parse_retry_after("0"), Some(Duration::ZERO));
/// assert_eq!(parse_retry_after("soon"), None);
/// ```
#[must_use]
#[instrument]
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    let header_value = header_value.trim();

    if let Ok(seconds) = header_value.parse::<i64>() {
        if seconds < 0 {
            debug!(seconds, "negative Retry-After value, ignoring");
            return None;
        }

        #[allow(clippy::cast_sign_loss)]
        let duration = Duration::from_secs(seconds as u64);
        if duration > MAX_RETRY_AFTER {
            warn!(
                seconds,
                max_seconds = MAX_RETRY_AFTER.as_secs(),
                "Retry-After exceeds maximum, capping at 1 hour"
            );
            return Some(MAX_RETRY_AFTER);
        }
        return Some(duration);
    }

    let Ok(datetime) = httpdate::parse_http_date(header_value) else {
        debug!(header_value, "unparseable Retry-After value");
        return None;
    };

    match datetime.duration_since(std::time::SystemTime::now()) {
        Ok(duration) => Some(duration.min(MAX_RETRY_AFTER)),
        Err(_) => {
            debug!(header_value, "Retry-After date is in the past, returning zero");
            Some(Duration::ZERO)
        }
    }
}
