//! Ties the customer feed, watcher and notification store together.
//!
//! The watcher re-runs on exactly two triggers: a fresh customer list, and a
//! change to the notification list made through this service.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use certwatch_core::Customer;
use certwatch_notify::{Clock, ExpiryWatcher, NotificationSpec, NotificationStore, WatchReport};
use certwatch_storage::KeyValueStore;

use crate::cache::CustomerCache;
use crate::source::CustomerSource;

/// What a refresh did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The listing was fetched and scanned.
    Fresh { customers: usize, report: WatchReport },
    /// The fetch failed; the previous customer list is still in use.
    Stale {
        error: String,
        last_successful_fetch: Option<DateTime<Utc>>,
    },
}

pub struct AlertService {
    store: NotificationStore,
    watcher: ExpiryWatcher,
    cache: CustomerCache,
    source: Arc<dyn CustomerSource>,
}

impl AlertService {
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        source: Arc<dyn CustomerSource>,
        watcher: ExpiryWatcher,
    ) -> Self {
        Self {
            store: NotificationStore::load(kv.clone(), clock),
            watcher,
            cache: CustomerCache::load(kv),
            source,
        }
    }

    pub fn store(&self) -> &NotificationStore {
        &self.store
    }

    /// Direct store access for listeners and trackers. Mutations made here do
    /// not re-run the watcher.
    pub fn store_mut(&mut self) -> &mut NotificationStore {
        &mut self.store
    }

    pub fn customers(&self) -> &[Customer] {
        self.cache.customers()
    }

    pub fn last_successful_fetch(&self) -> Option<DateTime<Utc>> {
        self.cache.last_successful_fetch()
    }

    /// Fetch customers and scan them. Never fails: a fetch error keeps the
    /// cached list and is reported as [`RefreshOutcome::Stale`].
    pub async fn refresh(&mut self) -> RefreshOutcome {
        match self.source.fetch_customers().await {
            Ok(customers) => {
                let count = customers.len();
                let fetched_at = self.store.now();
                self.cache.replace(customers, fetched_at);
                let report = self.rescan();
                info!(
                    source = self.source.source_name(),
                    customers = count,
                    emitted = report.emitted,
                    "Customer refresh complete"
                );
                RefreshOutcome::Fresh {
                    customers: count,
                    report,
                }
            }
            Err(e) => {
                warn!(
                    source = self.source.source_name(),
                    error = %e,
                    last_successful_fetch = ?self.cache.last_successful_fetch(),
                    "Customer refresh failed, keeping cached customers"
                );
                RefreshOutcome::Stale {
                    error: e.to_string(),
                    last_successful_fetch: self.cache.last_successful_fetch(),
                }
            }
        }
    }

    /// Run the watcher over the cached customers.
    pub fn rescan(&mut self) -> WatchReport {
        self.watcher.run_pass(self.cache.customers(), &mut self.store)
    }

    /// Run the watcher over a customer list that did not come from the
    /// source (e.g., a file). The cache is left alone.
    pub fn scan(&mut self, customers: &[Customer]) -> WatchReport {
        self.watcher.run_pass(customers, &mut self.store)
    }

    pub fn add(&mut self, spec: NotificationSpec) -> Vec<String> {
        let ids = self.store.add(spec);
        self.rescan();
        ids
    }

    pub fn mark_read(&mut self, id: &str) -> bool {
        let changed = self.store.mark_read(id);
        self.rescan();
        changed
    }

    pub fn mark_all_read(&mut self) {
        self.store.mark_all_read();
        self.rescan();
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let removed = self.store.remove(id);
        if removed {
            self.rescan();
        }
        removed
    }

    pub fn clear(&mut self) {
        self.store.clear();
        self.rescan();
    }
}
