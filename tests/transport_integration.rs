//! Integration tests for the rate-limited transport.
//!
//! These use real sockets and real time; the longest test sleeps about two
//! seconds for a `Retry-After` header.

use std::net::TcpListener;
use std::time::{Duration, Instant};

use birdcache_core::transport::{
    DEFAULT_MAX_ATTEMPTS, RateLimitedTransport, RateLimiter, RetryPolicy, TransportError,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

const TIMEOUT: Duration = Duration::from_secs(10);

fn transport(limiter: RateLimiter) -> RateLimitedTransport {
    RateLimitedTransport::new(RetryPolicy::default(), limiter).expect("transport")
}

#[tokio::test]
async fn test_retry_after_is_honored_then_request_succeeds() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/wiki/File:Robin.jpg"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "2"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wiki/File:Robin.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>file page</html>"))
        .mount(&server)
        .await;

    let transport = transport(RateLimiter::disabled());
    let started = Instant::now();
    let response = transport
        .get(&format!("{}/wiki/File:Robin.jpg", server.uri()), TIMEOUT)
        .await
        .expect("second attempt should succeed");

    assert!(started.elapsed() >= Duration::from_secs(2));
    assert_eq!(response.status, 200);
    assert_eq!(response.text(), "<html>file page</html>");
    assert_eq!(transport.requests_issued(), 2);
    assert!(transport.requests_issued() <= u64::from(DEFAULT_MAX_ATTEMPTS));
}

#[tokio::test]
async fn test_persistent_rate_limiting_exhausts_retries() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .expect(u64::from(DEFAULT_MAX_ATTEMPTS))
        .mount(&server)
        .await;

    let transport = transport(RateLimiter::disabled());
    let error = transport
        .get(&format!("{}/busy", server.uri()), TIMEOUT)
        .await
        .expect_err("all attempts are rate limited");

    match error {
        TransportError::RetriesExhausted { attempts, .. } => {
            assert_eq!(attempts, DEFAULT_MAX_ATTEMPTS);
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let transport = transport(RateLimiter::disabled());
    let error = transport
        .get(&format!("{}/missing", server.uri()), TIMEOUT)
        .await
        .expect_err("404 is fatal");

    assert!(matches!(error, TransportError::HttpStatus { status: 404, .. }));
    assert_eq!(transport.requests_issued(), 1);
}

#[tokio::test]
async fn test_requests_are_spaced_by_the_limiter() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let delay = Duration::from_millis(200);
    let transport = transport(RateLimiter::new(delay));
    let url = format!("{}/page", server.uri());

    let started = Instant::now();
    for _ in 0..4 {
        transport.get(&url, TIMEOUT).await.expect("request succeeds");
    }

    // Three gaps of at least the jitter floor each.
    assert!(started.elapsed() >= delay.mul_f64(0.7) * 3);
}

#[tokio::test]
async fn test_is_reachable_probe() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;

    let transport = transport(RateLimiter::disabled());
    assert!(transport.is_reachable(&server.uri(), Duration::from_secs(3)).await);

    let closed_port = TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .expect("ephemeral port")
        .port();
    assert!(
        !transport
            .is_reachable(&format!("http://127.0.0.1:{closed_port}/"), Duration::from_secs(3))
            .await
    );
}
