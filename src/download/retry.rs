//! Failure classification and the retry decision function.
//!
//! The terminal-or-retry choice is a pure function of the failure kind and
//! the attempt number, so it can be tested without any I/O. Only transient
//! network failures (connection problems, timeouts) are retried; HTTP error
//! statuses, bad redirects, local IO failures, and invalid input never are.
//! Backoff is linear: the attempt that just failed waits `attempt x base`.

use std::time::Duration;

use tracing::debug;

use super::DownloadError;
use super::constants::{DEFAULT_MAX_RETRIES, RETRY_BASE_DELAY};

/// Classification of a download failure, driving the retry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Malformed or non-HTTP(S) URL; fails before any request is made.
    InvalidInput,
    /// Connection reset/refused or timeout; may succeed on retry.
    Transient,
    /// HTTP error status, malformed redirect, exhausted redirect chain.
    Permanent,
    /// Directory-create or file-write failure; the partial file is removed.
    LocalIo,
}

/// Decision for a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the given delay; `attempt` is the upcoming attempt number.
    Retry {
        delay: Duration,
        attempt: u32,
    },
    /// Give up; the task is terminally failed.
    Fail {
        /// Why no further attempt is made.
        reason: &'static str,
    },
}

/// Maps a [`DownloadError`] to its [`FailureKind`].
#[must_use]
pub fn classify_failure(error: &DownloadError) -> FailureKind {
    match error {
        DownloadError::InvalidUrl { .. } => FailureKind::InvalidInput,
        DownloadError::Timeout { .. } => FailureKind::Transient,
        DownloadError::Network { source, .. } => {
            // TLS/certificate problems will not clear up on retry.
            if is_tls_error(source) {
                FailureKind::Permanent
            } else {
                FailureKind::Transient
            }
        }
        DownloadError::HttpStatus { .. }
        | DownloadError::RedirectTarget { .. }
        | DownloadError::TooManyRedirects { .. } => FailureKind::Permanent,
        DownloadError::Io { .. } => FailureKind::LocalIo,
    }
}

fn is_tls_error(error: &reqwest::Error) -> bool {
    let text = error.to_string().to_lowercase();
    text.contains("certificate")
        || text.contains("tls")
        || text.contains("ssl")
        || text.contains("handshake")
}

/// Retry configuration: how many retries beyond the first attempt, and the
/// linear backoff base.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: RETRY_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with explicit retry count and backoff base.
    #[must_use]
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Returns the configured retry count (beyond the first attempt).
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Decides whether to retry after attempt number `attempt` (1-indexed)
    /// failed with `kind`.
    #[must_use]
    pub fn decide(&self, kind: FailureKind, attempt: u32) -> RetryDecision {
        match kind {
            FailureKind::InvalidInput => {
                return RetryDecision::Fail {
                    reason: "invalid input",
                };
            }
            FailureKind::Permanent => {
                return RetryDecision::Fail {
                    reason: "permanent failure",
                };
            }
            FailureKind::LocalIo => {
                return RetryDecision::Fail {
                    reason: "local IO failure",
                };
            }
            FailureKind::Transient => {}
        }

        if attempt > self.max_retries {
            debug!(attempt, max_retries = self.max_retries, "retries exhausted");
            return RetryDecision::Fail {
                reason: "retries exhausted",
            };
        }

        RetryDecision::Retry {
            delay: self.base_delay.saturating_mul(attempt),
            attempt: attempt + 1,
        }
    }
}
