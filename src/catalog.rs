//! Deduplicated, insertion-ordered catalog of classified resources.
//!
//! One catalog exists per scrape session. [`Catalog::offer`] performs an
//! atomic check-and-insert keyed by exact URL (first write wins), so
//! concurrent offers of the same URL accept exactly one record. Accepted
//! records are immutable and survive until [`Catalog::reset`].

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify::{Category, Observation};

/// One classified resource, keyed by its exact URL.
///
/// Created on first sighting of a URL and never mutated; a duplicate
/// observation of the same URL is silently dropped by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Resource URL, the record's identity (exact string, no normalization).
    pub url: String,
    /// Assigned category.
    pub category: Category,
    /// Response `content-type`, empty when the header was absent.
    pub content_type: String,
    /// Declared size in bytes, 0 when unknown.
    pub size_bytes: u64,
    /// HTTP status of the observed response.
    pub status_code: u16,
    /// Wall-clock observation time, milliseconds since the Unix epoch.
    pub observed_at_millis: i64,
}

impl ResourceRecord {
    /// Builds a record from an observation and its assigned category,
    /// stamping the current time.
    #[must_use]
    pub fn from_observation(observation: &Observation, category: Category) -> Self {
        Self {
            url: observation.url.clone(),
            category,
            content_type: observation.content_type().to_string(),
            size_bytes: observation.content_length().unwrap_or(0),
            status_code: observation.status_code,
            observed_at_millis: now_millis(),
        }
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Receives one notification per newly accepted record.
///
/// Notifications are synchronous with the accepting `offer` call and carry
/// the record plus the catalog size including it. Implemented for closures.
pub trait CatalogObserver: Send + Sync {
    fn on_record(&self, record: &ResourceRecord, total: usize);
}

impl<F> CatalogObserver for F
where
    F: Fn(&ResourceRecord, usize) + Send + Sync,
{
    fn on_record(&self, record: &ResourceRecord, total: usize) {
        self(record, total);
    }
}

#[derive(Debug, Default)]
struct CatalogInner {
    records: Vec<ResourceRecord>,
    seen: HashSet<String>,
}

/// Insertion-ordered, URL-deduplicated store of [`ResourceRecord`]s.
///
/// Interior mutability allows offers from the collaborator's event threads;
/// the dedup check and the insert happen under one lock so concurrent offers
/// of the same URL cannot both be accepted.
#[derive(Default)]
pub struct Catalog {
    inner: Mutex<CatalogInner>,
    observer: Mutex<Option<Arc<dyn CatalogObserver>>>,
}

impl Catalog {
    /// Creates an empty catalog with no observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the observer notified on each accepted record, replacing
    /// any previous one.
    pub fn set_observer(&self, observer: Arc<dyn CatalogObserver>) {
        if let Ok(mut slot) = self.observer.lock() {
            *slot = Some(observer);
        }
    }

    /// Offers a record for insertion.
    ///
    /// Returns `false` without mutation when a record with the same URL is
    /// already present. On acceptance the observer (if any) is notified with
    /// the record and the new total count before this method returns.
    pub fn offer(&self, record: ResourceRecord) -> bool {
        let (accepted_record, total) = {
            let Ok(mut inner) = self.inner.lock() else {
                return false;
            };
            if !inner.seen.insert(record.url.clone()) {
                debug!(url = %record.url, "duplicate resource dropped");
                return false;
            }
            inner.records.push(record.clone());
            (record, inner.records.len())
        };

        // Notify outside the records lock so an observer that re-enters the
        // catalog (e.g. calls snapshot) does not deadlock.
        let observer = self.observer.lock().ok().and_then(|slot| slot.clone());
        if let Some(observer) = observer {
            observer.on_record(&accepted_record, total);
        }
        true
    }

    /// Returns a defensive copy of all records in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ResourceRecord> {
        self.inner
            .lock()
            .map(|inner| inner.records.clone())
            .unwrap_or_default()
    }

    /// Returns the number of accepted records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.records.len()).unwrap_or(0)
    }

    /// Returns true when the catalog holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears all records. This is the only way records are destroyed short
    /// of dropping the catalog itself.
    pub fn reset(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.records.clear();
            inner.seen.clear();
        }
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog").field("len", &self.len()).finish()
    }
}
