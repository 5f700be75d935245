//! Constants for the transport module (timeouts, spacing, retry ceilings).

use std::time::Duration;

/// Default HTTP connect timeout (10 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Timeout for media search result pages.
pub const SEARCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for a single file (detail) page.
pub const DETAIL_PAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for an image download.
pub const IMAGE_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for the pre-flight connectivity probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Default minimum spacing between any two outbound requests.
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(1500);

/// Lower bound of the spacing jitter factor.
pub const JITTER_FLOOR: f64 = 0.7;

/// Upper bound of the spacing jitter factor.
pub const JITTER_CEILING: f64 = 1.3;

/// Maximum Retry-After header value (1 hour) to prevent excessive delays.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Largest response body accepted (32 MiB).
pub const MAX_BODY_BYTES: u64 = 32 * 1024 * 1024;
