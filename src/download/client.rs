//! HTTP fetcher with browser-profile headers and explicit redirect handling.
//!
//! Automatic redirect following is disabled on the underlying client:
//! 301/302/307/308 responses are re-issued against the resolved `Location`
//! so the engine can keep one logical task identity across hops and resolve
//! the save path from the final URL. Bodies stream straight to disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, COOKIE, LOCATION, ORIGIN, PRAGMA, REFERER, USER_AGENT,
};
use reqwest::{Client, redirect};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};
use url::Url;

use super::constants::REQUEST_TIMEOUT;
use super::error::DownloadError;
use super::savepath::resolve_save_path;

/// Browser-profile User-Agent sent with every fetch. Game CDNs routinely
/// reject unknown agents, so requests present as desktop Chrome.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const ACCEPT_LANGUAGE_VALUE: &str = "zh-CN,zh;q=0.9,en;q=0.8";

/// Redirect statuses that are re-issued rather than treated as failures.
fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 307 | 308)
}

/// HTTP client for fetching resources with manual redirect handling.
///
/// Create once and reuse across a batch to share the connection pool.
#[derive(Debug, Clone)]
pub struct FetchClient {
    client: Client,
}

impl Default for FetchClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchClient {
    /// Creates a client with the default 60 second request timeout.
    ///
    /// # Panics
    ///
    /// Panics if the client builder fails with this static configuration,
    /// which does not happen in practice.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    /// Creates a client with an explicit per-request timeout.
    ///
    /// # Panics
    ///
    /// Panics if the client builder fails with this configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(timeout)
            .gzip(true)
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Fetches `url`, following up to `max_redirects` redirect hops, and
    /// returns the successful response together with the final URL it came
    /// from.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::InvalidUrl`] for unparsable or non-HTTP(S) URLs
    /// - [`DownloadError::Timeout`] / [`DownloadError::Network`] for
    ///   transport failures
    /// - [`DownloadError::HttpStatus`] for non-2xx, non-redirect responses
    /// - [`DownloadError::RedirectTarget`] for missing/unjoinable Location
    /// - [`DownloadError::TooManyRedirects`] past the hop bound
    pub async fn fetch(
        &self,
        url: &str,
        cookie_header: Option<&str>,
        max_redirects: usize,
    ) -> Result<(reqwest::Response, Url), DownloadError> {
        let mut current = Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;
        if !matches!(current.scheme(), "http" | "https") {
            return Err(DownloadError::invalid_url(url));
        }

        for _hop in 0..=max_redirects {
            let response = self.send_get(&current, cookie_header).await?;
            let status = response.status().as_u16();

            if is_redirect(status) {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .map(ToString::to_string)
                    .ok_or_else(|| DownloadError::redirect_target(current.as_str(), ""))?;
                let next = current
                    .join(&location)
                    .map_err(|_| DownloadError::redirect_target(current.as_str(), &location))?;
                debug!(from = %current, to = %next, status, "following redirect");
                current = next;
                continue;
            }

            if !response.status().is_success() {
                return Err(DownloadError::http_status(current.as_str(), status));
            }

            return Ok((response, current));
        }

        Err(DownloadError::too_many_redirects(url, max_redirects))
    }

    /// Fetches `url` and streams the body to its resolved save path under
    /// `destination_root`, creating intermediate directories. The save path
    /// is derived from the final URL after redirects. A failed write removes
    /// the partial file.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`fetch`](Self::fetch) plus
    /// [`DownloadError::Io`] for directory/file failures.
    #[instrument(skip(self, cookie_header, destination_root), fields(url = %url))]
    pub async fn fetch_to_file(
        &self,
        url: &str,
        destination_root: &Path,
        cookie_header: Option<&str>,
        max_redirects: usize,
    ) -> Result<PathBuf, DownloadError> {
        let (response, final_url) = self.fetch(url, cookie_header, max_redirects).await?;

        let save_path = resolve_save_path(final_url.as_str(), destination_root)?;
        if let Some(parent) = save_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::io(parent.to_path_buf(), e))?;
        }

        let file = File::create(&save_path)
            .await
            .map_err(|e| DownloadError::io(save_path.clone(), e))?;

        match stream_to_file(file, response, final_url.as_str(), &save_path).await {
            Ok(bytes) => {
                info!(path = %save_path.display(), bytes, "download complete");
                Ok(save_path)
            }
            Err(error) => {
                debug!(path = %save_path.display(), "removing partial file after error");
                let _ = tokio::fs::remove_file(&save_path).await;
                Err(error)
            }
        }
    }

    async fn send_get(
        &self,
        url: &Url,
        cookie_header: Option<&str>,
    ) -> Result<reqwest::Response, DownloadError> {
        let origin = url.origin().ascii_serialization();
        let mut request = self
            .client
            .get(url.clone())
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(ACCEPT, "*/*")
            .header(ACCEPT_LANGUAGE, ACCEPT_LANGUAGE_VALUE)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .header(REFERER, format!("{origin}/"))
            .header(ORIGIN, origin);
        if let Some(cookies) = cookie_header {
            request = request.header(COOKIE, cookies);
        }

        request.send().await.map_err(|e| {
            if e.is_timeout() {
                DownloadError::timeout(url.as_str())
            } else {
                DownloadError::network(url.as_str(), e)
            }
        })
    }
}

/// Streams the response body into the file, returning bytes written.
async fn stream_to_file(
    file: File,
    response: reqwest::Response,
    url: &str,
    save_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            if e.is_timeout() {
                DownloadError::timeout(url)
            } else {
                DownloadError::network(url, e)
            }
        })?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(save_path.to_path_buf(), e))?;
        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(save_path.to_path_buf(), e))?;

    Ok(bytes_written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn test_fetch_to_file_writes_body_at_url_path() {
        let server = MockServer::start().await;
        let out = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/assets/tex/hero.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png bytes"))
            .mount(&server)
            .await;

        let client = FetchClient::new();
        let url = format!("{}/assets/tex/hero.png", server.uri());
        let saved = client
            .fetch_to_file(&url, out.path(), None, 10)
            .await
            .unwrap();

        assert_eq!(saved, out.path().join("assets/tex/hero.png"));
        assert_eq!(std::fs::read(&saved).unwrap(), b"png bytes");
    }

    #[tokio::test]
    async fn test_fetch_follows_relative_redirect() {
        let server = MockServer::start().await;
        let out = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/old/hero.png"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/new/hero.png"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new/hero.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"moved"))
            .mount(&server)
            .await;

        let client = FetchClient::new();
        let url = format!("{}/old/hero.png", server.uri());
        let saved = client
            .fetch_to_file(&url, out.path(), None, 10)
            .await
            .unwrap();

        // The save path follows the final URL, not the original.
        assert_eq!(saved, out.path().join("new/hero.png"));
        assert_eq!(std::fs::read(&saved).unwrap(), b"moved");
    }

    #[tokio::test]
    async fn test_fetch_redirect_without_location_is_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/dangling"))
            .respond_with(ResponseTemplate::new(301))
            .mount(&server)
            .await;

        let client = FetchClient::new();
        let url = format!("{}/dangling", server.uri());
        let result = client.fetch(&url, None, 10).await;
        assert!(matches!(
            result,
            Err(DownloadError::RedirectTarget { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_redirect_loop_hits_bound() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/loop"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/loop"))
            .mount(&server)
            .await;

        let client = FetchClient::new();
        let url = format!("{}/loop", server.uri());
        let result = client.fetch(&url, None, 5).await;
        assert!(matches!(
            result,
            Err(DownloadError::TooManyRedirects { limit: 5, .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_non_2xx_is_http_status_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/missing.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = FetchClient::new();
        let url = format!("{}/missing.png", server.uri());
        let result = client.fetch(&url, None, 10).await;
        match result {
            Err(DownloadError::HttpStatus { status: 404, .. }) => {}
            other => panic!("expected HttpStatus 404, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_http_scheme() {
        let client = FetchClient::new();
        let result = client.fetch("ftp://a.test/file.bin", None, 10).await;
        assert!(matches!(result, Err(DownloadError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_fetch_sends_browser_headers_and_cookies() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/guarded.png"))
            .and(header("Cookie", "sid=abc; lang=en"))
            .and(header("Accept", "*/*"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok"))
            .expect(1)
            .mount(&server)
            .await;

        let client = FetchClient::new();
        let url = format!("{}/guarded.png", server.uri());
        let (response, _) = client.fetch(&url, Some("sid=abc; lang=en"), 10).await.unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }

    #[tokio::test]
    async fn test_fetch_to_file_cleans_up_on_stream_failure() {
        let server = MockServer::start().await;
        let out = TempDir::new().unwrap();

        // Body delivery slower than the client timeout: the stream errors
        // after the file was created.
        Mock::given(method("GET"))
            .and(path("/slow.bin"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![0u8; 1024])
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = FetchClient::with_timeout(Duration::from_millis(200));
        let url = format!("{}/slow.bin", server.uri());
        let result = client.fetch_to_file(&url, out.path(), None, 10).await;

        assert!(result.is_err());
        assert!(
            !out.path().join("slow.bin").exists(),
            "partial file must be removed"
        );
    }
}
