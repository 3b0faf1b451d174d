//! Scrape-session lifecycle: observation intake, cookies, reset.
//!
//! A [`Session`] owns the catalog for one scraping run and replaces the
//! process-global state of a typical scraper with an explicit object that is
//! passed by reference into the pipeline. Closing the browsing window maps
//! to [`Session::stop`]: observation intake ceases immediately, while any
//! download batch already running on a catalog snapshot is unaffected (the
//! two lifecycles are independent).

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::catalog::{Catalog, ResourceRecord};
use crate::classify::{Observation, classify, is_excluded_url, passes_size_filter};

/// One browser session cookie forwarded by the collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

/// State for one scraping session: the catalog, a collection switch, and the
/// cookies captured from the browsing collaborator.
#[derive(Debug)]
pub struct Session {
    catalog: Arc<Catalog>,
    collecting: AtomicBool,
    cookies: Mutex<Vec<Cookie>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Creates a session with an empty catalog and collection active.
    #[must_use]
    pub fn new() -> Self {
        Self {
            catalog: Arc::new(Catalog::new()),
            collecting: AtomicBool::new(true),
            cookies: Mutex::new(Vec::new()),
        }
    }

    /// Runs one observation through the intake pipeline: exclusion
    /// pre-filter, classification, size filter, then catalog offer.
    ///
    /// Returns true when the observation produced a newly cataloged record.
    /// Returns false once the session is stopped, for excluded or too-small
    /// resources, and for duplicate URLs.
    pub fn ingest(&self, observation: Observation) -> bool {
        if !self.is_collecting() {
            trace!(url = %observation.url, "session stopped, observation dropped");
            return false;
        }
        if is_excluded_url(&observation.url) {
            trace!(url = %observation.url, "excluded URL dropped");
            return false;
        }

        let category = classify(&observation);
        if !passes_size_filter(category, observation.content_length()) {
            debug!(
                url = %observation.url,
                %category,
                size = observation.content_length().unwrap_or(0),
                "small resource dropped"
            );
            return false;
        }

        self.catalog
            .offer(ResourceRecord::from_observation(&observation, category))
    }

    /// Stops observation intake. Idempotent; does not touch cataloged
    /// records or any in-flight download batch.
    pub fn stop(&self) {
        self.collecting.store(false, Ordering::SeqCst);
    }

    /// Returns true while the session accepts observations.
    #[must_use]
    pub fn is_collecting(&self) -> bool {
        self.collecting.load(Ordering::SeqCst)
    }

    /// Clears the catalog and restarts collection for a fresh scrape.
    pub fn reset(&self) {
        self.catalog.reset();
        self.collecting.store(true, Ordering::SeqCst);
    }

    /// Returns the session catalog.
    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Replaces the forwarded browser cookies.
    pub fn set_cookies(&self, cookies: Vec<Cookie>) {
        if let Ok(mut slot) = self.cookies.lock() {
            *slot = cookies;
        }
    }

    /// Serializes the forwarded cookies as a single `Cookie` header value
    /// (`name=value; name=value`), or `None` when there are none.
    #[must_use]
    pub fn cookie_header(&self) -> Option<String> {
        let cookies = self.cookies.lock().ok()?;
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}
