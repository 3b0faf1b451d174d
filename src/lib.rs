//! Assetgrab Core Library
//!
//! This library provides the core pipeline for the assetgrab tool: it
//! classifies network resource observations captured while a browser session
//! plays a web game, accumulates them into a deduplicated catalog, and batch
//! downloads a selected subset to disk.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`classify`] - Pure classification of network observations
//! - [`catalog`] - Deduplicated, insertion-ordered resource catalog
//! - [`session`] - Scrape-session lifecycle (collection on/off, cookies)
//! - [`download`] - Batch download engine with redirects and retry
//! - [`progress`] - Progress snapshot contract for download batches
//! - [`wire`] - Versioned JSON envelope for cross-boundary payloads
//!
//! The browser automation host that produces observations and the UI that
//! renders progress are external collaborators; this crate only consumes
//! observations and emits callbacks.

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod classify;
pub mod download;
pub mod progress;
pub mod session;
pub mod wire;

// Re-export commonly used types
pub use catalog::{Catalog, CatalogObserver, ResourceRecord};
pub use classify::{Category, DeclaredKind, Observation, classify, is_excluded_url};
pub use download::{
    BatchDownloader, BatchOptions, BatchResult, DEFAULT_CONCURRENCY, DownloadError, FailureKind,
    FetchClient, RetryDecision, RetryPolicy, classify_failure, resolve_save_path,
};
pub use progress::{NullSink, ProgressSink, ProgressSnapshot};
pub use session::{Cookie, Session};
