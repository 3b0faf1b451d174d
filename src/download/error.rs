//! Error types for the download module.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching one resource.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The URL is malformed or not an HTTP(S) URL.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The offending URL string.
        url: String,
    },

    /// Network-level error (DNS, connection refused/reset, TLS, body read).
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request exceeded the per-request timeout.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Non-2xx, non-redirect HTTP response.
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned the status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Redirect response without a usable `Location` target.
    #[error("malformed redirect target {location:?} from {url}")]
    RedirectTarget {
        /// The URL whose response redirected.
        url: String,
        /// The raw Location value, empty when the header was missing.
        location: String,
    },

    /// Redirect chain exceeded the configured bound.
    #[error("too many redirects (> {limit}) downloading {url}")]
    TooManyRedirects {
        /// The original request URL.
        url: String,
        /// The configured chain bound.
        limit: usize,
    },

    /// File system error (directory creation, file create/write).
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl DownloadError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a malformed-redirect error.
    pub fn redirect_target(url: impl Into<String>, location: impl Into<String>) -> Self {
        Self::RedirectTarget {
            url: url.into(),
            location: location.into(),
        }
    }

    /// Creates a redirect-chain-bound error.
    pub fn too_many_redirects(url: impl Into<String>, limit: usize) -> Self {
        Self::TooManyRedirects {
            url: url.into(),
            limit,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// No From<reqwest::Error> / From<std::io::Error>: every variant needs the
// URL or path context the source error does not carry, so the helper
// constructors are the intended construction path.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_display() {
        let msg = DownloadError::invalid_url("ftp://a.test/file").to_string();
        assert!(msg.contains("invalid URL"));
        assert!(msg.contains("ftp://a.test/file"));
    }

    #[test]
    fn test_http_status_display() {
        let msg = DownloadError::http_status("https://a.test/x.png", 404).to_string();
        assert!(msg.contains("HTTP 404"), "got: {msg}");
        assert!(msg.contains("https://a.test/x.png"));
    }

    #[test]
    fn test_redirect_target_display() {
        let msg = DownloadError::redirect_target("https://a.test/x", "").to_string();
        assert!(msg.contains("malformed redirect target"), "got: {msg}");
    }

    #[test]
    fn test_too_many_redirects_display() {
        let msg = DownloadError::too_many_redirects("https://a.test/x", 10).to_string();
        assert!(msg.contains("too many redirects"), "got: {msg}");
        assert!(msg.contains("10"));
    }

    #[test]
    fn test_io_display_contains_path() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let msg = DownloadError::io("/out/a/b.png", source).to_string();
        assert!(msg.contains("/out/a/b.png"), "got: {msg}");
    }
}
