//! Constants for the download module (timeouts, pacing, retry).

use std::time::Duration;

/// Per-request timeout (60 seconds, covers connect through body).
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Pause between download groups, to stay under server-side rate limits.
pub const GROUP_DELAY: Duration = Duration::from_millis(500);

/// Base delay for linear retry backoff (attempt N waits N x this).
pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Default retries beyond the first attempt for transient failures.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Bound on redirect chain length per request.
pub const MAX_REDIRECTS: usize = 10;
