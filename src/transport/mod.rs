//! Shared HTTP transport with global request spacing and retry.
//!
//! Every outbound request in the crate goes through one
//! [`RateLimitedTransport`] instance, constructed once and shared behind an
//! `Arc`. There is no process-wide session or timestamp state.
//!
//! # Features
//!
//! - One pooled `reqwest` client with a project User-Agent
//! - Global jittered spacing between any two requests ([`RateLimiter`])
//! - 429 handling that honours `Retry-After`
//! - Exponential backoff on transient network errors
//! - Per-request timeouts and a response size cap

mod client;
pub mod constants;
mod error;
pub mod rate_limiter;
mod retry;

pub use client::{RateLimitedTransport, TransportResponse};
pub use error::TransportError;
pub use rate_limiter::{RateLimiter, parse_retry_after};
pub use retry::{DEFAULT_MAX_ATTEMPTS, FailureKind, RetryDecision, RetryPolicy, classify_error};
