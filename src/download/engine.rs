//! Batch orchestration: grouped concurrency, retries, progress, counters.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::catalog::ResourceRecord;
use crate::progress::{ProgressSink, ProgressSnapshot};

use super::client::FetchClient;
use super::constants::{
    DEFAULT_MAX_RETRIES, GROUP_DELAY, MAX_REDIRECTS, REQUEST_TIMEOUT, RETRY_BASE_DELAY,
};
use super::retry::{RetryDecision, RetryPolicy, classify_failure};

/// Number of downloads in flight at once by default.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Cap on error messages kept in a [`BatchResult`].
pub const MAX_RECORDED_ERRORS: usize = 20;

/// Tuning knobs for a batch run. `Default` matches the crate constants.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Width of each download group.
    pub concurrency: usize,
    /// Pause between groups.
    pub group_delay: Duration,
    /// Linear backoff base for transient retries.
    pub retry_base_delay: Duration,
    /// Retries beyond the first attempt for transient failures.
    pub max_retries: u32,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Redirect chain bound per request.
    pub max_redirects: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            group_delay: GROUP_DELAY,
            retry_base_delay: RETRY_BASE_DELAY,
            max_retries: DEFAULT_MAX_RETRIES,
            request_timeout: REQUEST_TIMEOUT,
            max_redirects: MAX_REDIRECTS,
        }
    }
}

/// Terminal outcome of a batch. `succeeded + failed == total_requested`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BatchResult {
    /// Number of records the batch was asked to download.
    pub total_requested: usize,
    /// Records that downloaded successfully.
    pub succeeded: usize,
    /// Records that terminally failed.
    pub failed: usize,
    /// Human-readable error messages, capped at [`MAX_RECORDED_ERRORS`].
    pub errors: Vec<String>,
}

/// Shared per-batch counters, updated from download tasks.
#[derive(Debug, Default)]
struct BatchCounters {
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    errors: Mutex<Vec<String>>,
}

impl BatchCounters {
    fn record_success(&self) {
        self.succeeded.fetch_add(1, Ordering::SeqCst);
    }

    fn record_failure(&self, message: String) {
        self.failed.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut errors) = self.errors.lock() {
            if errors.len() < MAX_RECORDED_ERRORS {
                errors.push(message);
            }
        }
    }

    fn snapshot(&self, total: usize) -> ProgressSnapshot {
        let successful = self.succeeded.load(Ordering::SeqCst);
        let failed = self.failed.load(Ordering::SeqCst);
        ProgressSnapshot {
            total,
            downloaded: successful + failed,
            successful,
            failed,
        }
    }

    fn into_result(self, total_requested: usize) -> BatchResult {
        BatchResult {
            total_requested,
            succeeded: self.succeeded.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            errors: self.errors.into_inner().unwrap_or_default(),
        }
    }
}

/// Downloads batches of cataloged resources into a destination directory.
#[derive(Debug)]
pub struct BatchDownloader {
    client: FetchClient,
    options: BatchOptions,
}

impl Default for BatchDownloader {
    fn default() -> Self {
        Self::new(BatchOptions::default())
    }
}

impl BatchDownloader {
    /// Creates a downloader; the HTTP client inherits `request_timeout`.
    #[must_use]
    pub fn new(options: BatchOptions) -> Self {
        Self {
            client: FetchClient::with_timeout(options.request_timeout),
            options,
        }
    }

    /// Downloads every record, running `concurrency` at a time in sequential
    /// groups with a pause between groups. Each group finishes completely
    /// before the next starts. One snapshot goes to `sink` per group.
    ///
    /// Failures never abort the batch; they are counted and reported in the
    /// returned [`BatchResult`].
    #[instrument(skip_all, fields(total = records.len(), dest = %destination_root.display()))]
    pub async fn download_all(
        &self,
        records: &[ResourceRecord],
        destination_root: &Path,
        cookie_header: Option<&str>,
        sink: &dyn ProgressSink,
    ) -> BatchResult {
        let total = records.len();
        let counters = BatchCounters::default();
        info!(total, "starting batch download");

        // Records with unusable URLs fail immediately, before any group runs.
        let mut valid: Vec<&ResourceRecord> = Vec::with_capacity(records.len());
        for record in records {
            if is_fetchable(&record.url) {
                valid.push(record);
            } else {
                warn!(url = %record.url, "skipping record with invalid URL");
                counters.record_failure(format!("invalid URL: {}", record.url));
            }
        }
        if !valid.is_empty() && counters.failed.load(Ordering::SeqCst) > 0 {
            sink.on_progress(counters.snapshot(total));
        }

        let policy = RetryPolicy::new(self.options.max_retries, self.options.retry_base_delay);
        let groups: Vec<Vec<String>> = valid
            .chunks(self.options.concurrency.max(1))
            .map(|chunk| chunk.iter().map(|r| r.url.clone()).collect())
            .collect();
        let group_count = groups.len();

        for (index, group) in groups.into_iter().enumerate() {
            let mut handles = Vec::with_capacity(group.len());
            for url in group {
                let client = self.client.clone();
                let policy = policy.clone();
                let dest: PathBuf = destination_root.to_path_buf();
                let cookies = cookie_header.map(ToString::to_string);
                let max_redirects = self.options.max_redirects;
                handles.push(tokio::spawn(async move {
                    download_one(&client, &policy, &url, &dest, cookies.as_deref(), max_redirects)
                        .await
                }));
            }

            for handle in handles {
                match handle.await {
                    Ok(Ok(())) => counters.record_success(),
                    Ok(Err(message)) => counters.record_failure(message),
                    Err(join_error) => {
                        counters.record_failure(format!("download task panicked: {join_error}"));
                    }
                }
            }

            sink.on_progress(counters.snapshot(total));
            debug!(group = index + 1, of = group_count, "group complete");

            if index + 1 < group_count && !self.options.group_delay.is_zero() {
                tokio::time::sleep(self.options.group_delay).await;
            }
        }

        let result = counters.into_result(total);
        info!(
            succeeded = result.succeeded,
            failed = result.failed,
            "batch complete"
        );
        result
    }
}

fn is_fetchable(url: &str) -> bool {
    matches!(Url::parse(url), Ok(parsed) if matches!(parsed.scheme(), "http" | "https"))
}

/// Runs one record to a terminal outcome: success, or an error message after
/// the retry policy gives up.
async fn download_one(
    client: &FetchClient,
    policy: &RetryPolicy,
    url: &str,
    destination_root: &Path,
    cookie_header: Option<&str>,
    max_redirects: usize,
) -> Result<(), String> {
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        let error = match client
            .fetch_to_file(url, destination_root, cookie_header, max_redirects)
            .await
        {
            Ok(_) => return Ok(()),
            Err(error) => error,
        };

        let kind = classify_failure(&error);
        match policy.decide(kind, attempt) {
            RetryDecision::Retry { delay, attempt: next } => {
                debug!(url, next_attempt = next, ?delay, %error, "retrying after failure");
                tokio::time::sleep(delay).await;
            }
            RetryDecision::Fail { reason } => {
                warn!(url, attempt, reason, %error, "giving up");
                return Err(error.to_string());
            }
        }
    }
}
