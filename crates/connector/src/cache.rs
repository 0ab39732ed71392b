//! Last-known customer list, persisted next to the notifications.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use certwatch_core::Customer;
use certwatch_storage::{read_json_or_default, write_json, KeyValueStore, CUSTOMERS_KEY};

/// Key holding the time of the last successful fetch.
pub const CUSTOMERS_FETCHED_AT_KEY: &str = "customers_fetched_at";

pub struct CustomerCache {
    kv: Arc<dyn KeyValueStore>,
    customers: Vec<Customer>,
    last_successful_fetch: Option<DateTime<Utc>>,
}

impl CustomerCache {
    /// Load the cached list; missing or corrupt values start empty.
    pub fn load(kv: Arc<dyn KeyValueStore>) -> Self {
        let customers: Vec<Customer> = read_json_or_default(kv.as_ref(), CUSTOMERS_KEY);
        let last_successful_fetch: Option<DateTime<Utc>> =
            read_json_or_default(kv.as_ref(), CUSTOMERS_FETCHED_AT_KEY);
        info!(count = customers.len(), last_fetch = ?last_successful_fetch, "Customer cache loaded");
        Self {
            kv,
            customers,
            last_successful_fetch,
        }
    }

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn last_successful_fetch(&self) -> Option<DateTime<Utc>> {
        self.last_successful_fetch
    }

    /// Replace the cached list after a successful fetch.
    ///
    /// The in-memory copy is always updated; a failed write is logged and
    /// only means the next process starts from the older list.
    pub fn replace(&mut self, customers: Vec<Customer>, fetched_at: DateTime<Utc>) {
        self.customers = customers;
        self.last_successful_fetch = Some(fetched_at);

        let written = write_json(self.kv.as_ref(), CUSTOMERS_KEY, &self.customers)
            .and_then(|()| write_json(self.kv.as_ref(), CUSTOMERS_FETCHED_AT_KEY, &fetched_at));
        if let Err(e) = written {
            error!(error = %e, "Failed to persist customer cache");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use certwatch_storage::MemoryStore;

    #[test]
    fn replace_persists_list_and_timestamp() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let fetched_at = Utc::now();
        let mut cache = CustomerCache::load(kv.clone());
        assert!(cache.customers().is_empty());
        assert!(cache.last_successful_fetch().is_none());

        cache.replace(vec![Customer::new("c1", "Ahmed", None)], fetched_at);

        let reloaded = CustomerCache::load(kv);
        assert_eq!(reloaded.customers().len(), 1);
        assert_eq!(reloaded.last_successful_fetch(), Some(fetched_at));
    }

    #[test]
    fn corrupt_cache_starts_empty() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(CUSTOMERS_KEY, "{oops").unwrap();
        let cache = CustomerCache::load(kv);
        assert!(cache.customers().is_empty());
    }
}
