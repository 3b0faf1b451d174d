//! Batch download engine for cataloged resources.
//!
//! This module turns a list of [`crate::catalog::ResourceRecord`]s into
//! files under a destination root. Downloads run in sequential groups of a
//! small fixed width, follow redirects explicitly, retry transient network
//! failures with linear backoff, and stream bodies straight to disk.
//!
//! # Example
//!
//! ```no_run
//! use assetgrab_core::{BatchDownloader, BatchOptions, NullSink};
//! use std::path::Path;
//!
//! # async fn example(records: Vec<assetgrab_core::ResourceRecord>) {
//! let downloader = BatchDownloader::new(BatchOptions::default());
//! let result = downloader
//!     .download_all(&records, Path::new("./saved"), None, &NullSink)
//!     .await;
//! println!("ok: {}, failed: {}", result.succeeded, result.failed);
//! # }
//! ```

mod client;
pub mod constants;
mod engine;
mod error;
mod retry;
mod savepath;

pub use client::{BROWSER_USER_AGENT, FetchClient};
pub use engine::{
    BatchDownloader, BatchOptions, BatchResult, DEFAULT_CONCURRENCY, MAX_RECORDED_ERRORS,
};
pub use error::DownloadError;
pub use retry::{FailureKind, RetryDecision, RetryPolicy, classify_failure};
pub use savepath::resolve_save_path;
