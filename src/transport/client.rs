//! Shared, rate-limited HTTP transport.
//!
//! This module provides [`RateLimitedTransport`], the single HTTP entry point
//! used by the resolver, the builder's image downloads, the connectivity probe
//! and the species refresh. It owns one `reqwest::Client` (connection reuse),
//! the global [`RateLimiter`], and the [`RetryPolicy`].

use std::panic::{AssertUnwindSafe, catch_unwind, set_hook, take_hook};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{CONTENT_LENGTH, HeaderMap, RETRY_AFTER};
use reqwest::{Client, ClientBuilder, Proxy};
use tracing::{debug, instrument, warn};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, MAX_BODY_BYTES};
use super::error::TransportError;
use super::rate_limiter::{RateLimiter, parse_retry_after};
use super::retry::{FailureKind, RetryDecision, RetryPolicy, classify_error};
use crate::user_agent;

/// A fully-read HTTP response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body bytes.
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Returns the body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP transport shared by every worker.
///
/// Construct it once and hand it out behind an `Arc`. All requests pass
/// through the same [`RateLimiter`], so spacing holds across workers.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use birdcache_core::transport::{RateLimitedTransport, RateLimiter, RetryPolicy};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = RateLimitedTransport::new(
///     RetryPolicy::default(),
///     RateLimiter::new(Duration::from_millis(1500)),
/// )?;
/// let response = transport.get("https://commons.wikimedia.org/", Duration::from_secs(15)).await?;
/// println!("{} bytes", response.body.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RateLimitedTransport {
    client: Client,
    limiter: RateLimiter,
    policy: RetryPolicy,
    requests_issued: AtomicU64,
}

impl RateLimitedTransport {
    /// Builds the shared client.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ClientBuild`] if the underlying client
    /// cannot be constructed even with the env-proxy fallback.
    pub fn new(policy: RetryPolicy, limiter: RateLimiter) -> Result<Self, TransportError> {
        let client = build_client(CONNECT_TIMEOUT_SECS)?;
        Ok(Self {
            client,
            limiter,
            policy,
            requests_issued: AtomicU64::new(0),
        })
    }

    /// Number of HTTP requests put on the wire so far, retries included.
    #[must_use]
    pub fn requests_issued(&self) -> u64 {
        self.requests_issued.load(Ordering::SeqCst)
    }

    /// Returns the retry policy in use.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Performs a GET and requires a 2xx response.
    ///
    /// # Errors
    ///
    /// See [`RateLimitedTransport::get_tolerating`].
    pub async fn get(&self, url: &str, timeout: Duration) -> Result<TransportResponse, TransportError> {
        self.get_tolerating(url, timeout, &[]).await
    }

    /// Performs a GET, returning non-2xx responses whose status is listed in
    /// `tolerated` instead of failing.
    ///
    /// 429 and transient network failures are retried per the policy; any
    /// other status fails immediately.
    ///
    /// # Errors
    ///
    /// - [`TransportError::InvalidUrl`] for unparseable URLs
    /// - [`TransportError::HttpStatus`] for untolerated non-2xx statuses
    /// - [`TransportError::BodyTooLarge`] when the body exceeds the size cap
    /// - [`TransportError::RetriesExhausted`] when the ceiling is reached
    #[instrument(skip(self, tolerated), fields(url = %url))]
    pub async fn get_tolerating(
        &self,
        url: &str,
        timeout: Duration,
        tolerated: &[u16],
    ) -> Result<TransportResponse, TransportError> {
        let parsed = Url::parse(url).map_err(|_| TransportError::invalid_url(url))?;

        let mut attempt = 0_u32;
        loop {
            self.limiter.acquire().await;
            self.requests_issued.fetch_add(1, Ordering::SeqCst);

            let (kind, last) = match self.fetch_once(&parsed, url, timeout).await {
                Ok(response) if response.is_success() || tolerated.contains(&response.status) => {
                    debug!(status = response.status, bytes = response.body.len(), "request complete");
                    return Ok(response);
                }
                Ok(response) if response.status == 429 => {
                    let retry_after = response
                        .headers
                        .get(RETRY_AFTER)
                        .and_then(|value| value.to_str().ok())
                        .and_then(parse_retry_after);
                    (FailureKind::RateLimited { retry_after }, "HTTP 429".to_string())
                }
                Ok(response) => return Err(TransportError::http_status(url, response.status)),
                Err(error) => {
                    let kind = classify_error(&error);
                    if kind == FailureKind::Fatal {
                        return Err(error);
                    }
                    (kind, error.to_string())
                }
            };

            match self.policy.decide(kind, attempt) {
                RetryDecision::Retry { delay } => {
                    if matches!(kind, FailureKind::RateLimited { .. }) {
                        self.limiter.record_rate_limit(delay);
                    }
                    warn!(
                        url,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis(),
                        reason = %last,
                        "retrying request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                RetryDecision::GiveUp { .. } => {
                    return Err(TransportError::retries_exhausted(url, attempt + 1, last));
                }
            }
        }
    }

    /// Single connectivity probe: one HEAD request, no retries.
    ///
    /// Any HTTP answer counts as reachable.
    #[instrument(skip(self))]
    pub async fn is_reachable(&self, url: &str, timeout: Duration) -> bool {
        self.limiter.acquire().await;
        self.requests_issued.fetch_add(1, Ordering::SeqCst);
        match self.client.head(url).timeout(timeout).send().await {
            Ok(response) => {
                debug!(status = response.status().as_u16(), "probe answered");
                true
            }
            Err(error) => {
                debug!(error = %error, "probe failed");
                false
            }
        }
    }

    async fn fetch_once(
        &self,
        parsed: &Url,
        url: &str,
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .get(parsed.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(url, e))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();

        let declared = headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());
        if declared.is_some_and(|length| length > MAX_BODY_BYTES) {
            return Err(TransportError::BodyTooLarge {
                url: url.to_string(),
                limit: MAX_BODY_BYTES,
            });
        }

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| TransportError::from_reqwest(url, e))?;
            if (body.len() + chunk.len()) as u64 > MAX_BODY_BYTES {
                return Err(TransportError::BodyTooLarge {
                    url: url.to_string(),
                    limit: MAX_BODY_BYTES,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

fn build_client(connect_timeout_secs: u64) -> Result<Client, TransportError> {
    match try_build_client(connect_timeout_secs, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Panic) => {
            warn!(
                "HTTP client builder panicked while loading system proxy settings; retrying with env-proxy fallback"
            );
            match try_build_client(connect_timeout_secs, true) {
                Ok(client) => Ok(client),
                Err(BuildClientFailure::Build(error)) => Err(TransportError::ClientBuild(error.to_string())),
                Err(BuildClientFailure::Panic) => Err(TransportError::ClientBuild(
                    "client builder panicked while applying env-proxy fallback".to_string(),
                )),
            }
        }
        Err(BuildClientFailure::Build(error)) => Err(TransportError::ClientBuild(error.to_string())),
    }
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

// `catch_unwind` does not suppress panic-hook stderr output, so the hook is
// silenced while a guarded build runs.
static CLIENT_BUILD_PANIC_HOOK_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

fn try_build_client(
    connect_timeout_secs: u64,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    catch_unwind_silent(AssertUnwindSafe(move || {
        let mut builder = base_client_builder(connect_timeout_secs);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn catch_unwind_silent<F, T>(operation: F) -> Result<T, Box<dyn std::any::Any + Send + 'static>>
where
    F: FnOnce() -> T + std::panic::UnwindSafe,
{
    let _panic_hook_guard = CLIENT_BUILD_PANIC_HOOK_LOCK
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let previous_hook = take_hook();
    set_hook(Box::new(|_| {}));
    let outcome = catch_unwind(operation);
    set_hook(previous_hook);
    outcome
}

fn base_client_builder(connect_timeout_secs: u64) -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .gzip(true)
        .user_agent(user_agent::default_user_agent())
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = env_proxy_for_scheme("https")
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = env_proxy_for_scheme("http")
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn env_proxy_for_scheme(scheme: &str) -> Option<String> {
    match scheme {
        "https" => find_first_proxy_var(&["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"]),
        "http" => find_first_proxy_var(&["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"]),
        _ => None,
    }
}

fn find_first_proxy_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}
