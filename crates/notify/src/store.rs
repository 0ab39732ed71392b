//! The canonical, persisted list of notifications.
//!
//! Every mutation writes the full list back to the key-value store before
//! listeners are told about it. A failed write rolls the in-memory list back,
//! so callers never see a state that was not persisted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use certwatch_storage::{read_json_or_default, write_json, KeyValueStore, NOTIFICATIONS_KEY};

use crate::clock::Clock;
use crate::error::NotifyError;
use crate::notification::{Notification, NotificationSpec};
use crate::targeting;

/// Handle returned by [`NotificationStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn Fn(&[Notification]) + Send + Sync>;

pub struct NotificationStore {
    kv: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    /// Newest first.
    items: Vec<Notification>,
    last_id: i64,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl NotificationStore {
    /// Load the persisted list, or start empty if it is missing or corrupt.
    pub fn load(kv: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        let items: Vec<Notification> = read_json_or_default(kv.as_ref(), NOTIFICATIONS_KEY);
        let last_id = items.iter().filter_map(|n| id_millis(&n.id)).max().unwrap_or(0);
        info!(count = items.len(), backend = kv.backend_name(), "Notifications loaded");
        Self {
            kv,
            clock,
            items,
            last_id,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Current notifications, newest first.
    pub fn list(&self) -> &[Notification] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&Notification> {
        self.items.iter().find(|n| n.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether an expiry alert for this exact customer and date is stored.
    pub fn has_expiry_alert(&self, customer_id: &str, expiry_date: &str) -> bool {
        self.items
            .iter()
            .any(|n| n.is_expiry_alert_for(customer_id, expiry_date))
    }

    /// Store a notification for the spec's audience.
    ///
    /// Returns the ids of the stored records, or an empty vec if nothing was
    /// stored (empty audience, or persistence failed).
    pub fn add(&mut self, spec: NotificationSpec) -> Vec<String> {
        let previous = self.items.clone();
        let now = self.clock.now();
        let base_id = self.next_id(now);

        let superseded = targeting::supersede(&mut self.items, &spec);
        let kind = spec.effective_kind();
        let (base, audience) = spec.into_base(base_id, now);
        let records = targeting::expand(base, audience);
        let ids: Vec<String> = records.iter().map(|n| n.id.clone()).collect();

        if records.is_empty() && superseded == 0 {
            debug!(kind = %kind, "Notification has no recipients, nothing stored");
            return ids;
        }

        self.items.splice(0..0, records);
        if !self.commit(previous, "add") {
            return Vec::new();
        }
        debug!(kind = %kind, stored = ids.len(), superseded, "Notification added");
        ids
    }

    /// Store a notification described by loosely-typed JSON.
    ///
    /// Malformed input (including `null`) is logged and ignored.
    pub fn add_raw(&mut self, value: &serde_json::Value) -> Vec<String> {
        match NotificationSpec::from_json(value) {
            Ok(spec) => self.add(spec),
            Err(e) => {
                warn!(error = %e, "Ignoring malformed notification");
                Vec::new()
            }
        }
    }

    /// Mark one notification read. Unknown ids are ignored.
    pub fn mark_read(&mut self, id: &str) -> bool {
        let previous = self.items.clone();
        let Some(n) = self.items.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        if n.read {
            return true;
        }
        n.read = true;
        self.commit(previous, "mark_read")
    }

    pub fn mark_all_read(&mut self) {
        if self.items.iter().all(|n| n.read) {
            return;
        }
        let previous = self.items.clone();
        for n in &mut self.items {
            n.read = true;
        }
        self.commit(previous, "mark_all_read");
    }

    /// Delete one notification. Unknown ids are ignored.
    pub fn remove(&mut self, id: &str) -> bool {
        let Some(pos) = self.items.iter().position(|n| n.id == id) else {
            return false;
        };
        let previous = self.items.clone();
        self.items.remove(pos);
        self.commit(previous, "remove")
    }

    pub fn clear(&mut self) {
        let previous = std::mem::take(&mut self.items);
        self.commit(previous, "clear");
    }

    /// Register a listener called with the full list after every change.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&[Notification]) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    /// Time-derived id, strictly increasing within this store.
    fn next_id(&mut self, now: DateTime<Utc>) -> String {
        let id = now.timestamp_millis().max(self.last_id + 1);
        self.last_id = id;
        id.to_string()
    }

    fn persist(&self) -> Result<(), NotifyError> {
        write_json(self.kv.as_ref(), NOTIFICATIONS_KEY, &self.items)?;
        Ok(())
    }

    fn commit(&mut self, previous: Vec<Notification>, op: &'static str) -> bool {
        match self.persist() {
            Ok(()) => {
                for (_, listener) in &self.listeners {
                    listener(&self.items);
                }
                true
            }
            Err(e) => {
                error!(op, error = %e, "Failed to persist notifications, change discarded");
                self.items = previous;
                false
            }
        }
    }
}

/// Millisecond prefix of a generated id (`<millis>[-user-<name>|-roles]`).
fn id_millis(id: &str) -> Option<i64> {
    id.split('-').next().and_then(|prefix| prefix.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use certwatch_storage::{MemoryStore, StorageError};
    use chrono::TimeZone;

    use crate::clock::FixedClock;
    use crate::notification::{Audience, NotificationKind};

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::other("disk full")))
        }
        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
        fn backend_name(&self) -> &str {
            "failing"
        }
    }

    fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap()))
    }

    fn store_with(kv: Arc<dyn KeyValueStore>) -> NotificationStore {
        NotificationStore::load(kv, clock())
    }

    #[test]
    fn add_fills_defaults_and_prepends() {
        let mut store = store_with(Arc::new(MemoryStore::new()));
        store.add(NotificationSpec::new("first", "m"));
        store.add(NotificationSpec::new("second", "m"));

        let list = store.list();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].title, "second");
        let n = &list[1];
        assert_eq!(n.kind, NotificationKind::Info);
        assert_eq!(n.path, "/");
        assert_eq!(n.icon, "bell");
        assert_eq!(n.color, "blue");
        assert!(!n.read);
        assert_eq!(n.created_at, store.now());
    }

    #[test]
    fn ids_stay_unique_within_one_millisecond() {
        let mut store = store_with(Arc::new(MemoryStore::new()));
        let a = store.add(NotificationSpec::new("a", "m"));
        let b = store.add(NotificationSpec::new("b", "m"));
        assert_ne!(a, b);
        assert!(b[0].parse::<i64>().unwrap() > a[0].parse::<i64>().unwrap());
    }

    #[test]
    fn ids_continue_after_reload() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let first = store_with(kv.clone()).add(NotificationSpec::new("a", "m").for_roles(["admin"]));
        let mut reloaded = store_with(kv);
        let second = reloaded.add(NotificationSpec::new("b", "m"));
        assert_eq!(reloaded.len(), 2);
        assert_ne!(first[0].trim_end_matches("-roles"), second[0]);
    }

    #[test]
    fn mutations_are_persisted() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut store = store_with(kv.clone());
        let ids = store.add(NotificationSpec::new("t", "m").for_user("mgr1"));
        store.mark_read(&ids[0]);

        let reloaded = store_with(kv.clone());
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.list()[0].read);

        store.clear();
        assert!(store_with(kv).is_empty());
    }

    #[test]
    fn unknown_ids_are_noops() {
        let mut store = store_with(Arc::new(MemoryStore::new()));
        store.add(NotificationSpec::new("t", "m"));
        assert!(!store.mark_read("nope"));
        assert!(!store.remove("nope"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn mark_all_read_and_remove() {
        let mut store = store_with(Arc::new(MemoryStore::new()));
        store.add(NotificationSpec::new("a", "m"));
        let ids = store.add(NotificationSpec::new("b", "m"));
        store.mark_all_read();
        assert!(store.list().iter().all(|n| n.read));
        assert!(store.remove(&ids[0]));
        assert_eq!(store.len(), 1);
        assert_eq!(store.list()[0].title, "a");
    }

    #[test]
    fn corrupt_storage_loads_empty_and_is_overwritten() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(NOTIFICATIONS_KEY, "[{\"id\": 12").unwrap();
        let mut store = store_with(kv.clone());
        assert!(store.is_empty());

        store.add(NotificationSpec::new("t", "m"));
        let raw = kv.get(NOTIFICATIONS_KEY).unwrap().unwrap();
        let parsed: Vec<Notification> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn failed_persist_leaves_state_unchanged() {
        let mut store = store_with(Arc::new(FailingStore));
        let ids = store.add(NotificationSpec::new("t", "m"));
        assert!(ids.is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn add_raw_ignores_null() {
        let mut store = store_with(Arc::new(MemoryStore::new()));
        assert!(store.add_raw(&serde_json::Value::Null).is_empty());
        assert!(store.is_empty());

        let ids = store.add_raw(&serde_json::json!({
            "type": "trip-added",
            "title": "Trip",
            "message": "New trip",
            "forUsers": ["alice", "bob"]
        }));
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn listeners_fire_on_change_until_unsubscribed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut store = store_with(Arc::new(MemoryStore::new()));
        let seen = calls.clone();
        let sub = store.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        store.add(NotificationSpec::new("t", "m").audience(Audience::Public));
        store.mark_all_read();
        // Nothing unread left, so no write and no callback.
        store.mark_all_read();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert!(store.unsubscribe(sub));
        store.clear();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
