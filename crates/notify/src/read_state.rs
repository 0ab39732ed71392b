//! Per-viewer visibility and unread counts.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::notification::Notification;
use crate::store::{NotificationStore, SubscriptionId};

/// The authenticated user looking at the notification list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub username: String,
    pub role: String,
}

impl Viewer {
    pub fn new(username: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            role: role.into(),
        }
    }
}

pub fn is_visible_to(n: &Notification, viewer: &Viewer) -> bool {
    if n.is_public() {
        return true;
    }
    n.for_user.as_deref() == Some(viewer.username.as_str())
        || n.for_users
            .as_ref()
            .is_some_and(|users| users.iter().any(|u| *u == viewer.username))
        || n.for_roles
            .as_ref()
            .is_some_and(|roles| roles.iter().any(|r| *r == viewer.role))
}

pub fn visible_to<'a>(
    list: &'a [Notification],
    viewer: &'a Viewer,
) -> impl Iterator<Item = &'a Notification> + 'a {
    list.iter().filter(move |n| is_visible_to(n, viewer))
}

pub fn unread_count(list: &[Notification], viewer: &Viewer) -> usize {
    visible_to(list, viewer).filter(|n| !n.read).count()
}

#[derive(Debug, Default)]
struct TrackerState {
    viewer: Option<Viewer>,
    count: usize,
}

/// Keeps the unread count for the current viewer up to date.
///
/// With no viewer (signed out) the count is zero.
#[derive(Debug, Clone)]
pub struct UnreadTracker {
    state: Arc<Mutex<TrackerState>>,
    subscription: SubscriptionId,
}

impl UnreadTracker {
    pub fn attach(store: &mut NotificationStore, viewer: Option<Viewer>) -> Self {
        let state = Arc::new(Mutex::new(TrackerState::default()));
        recompute(&state, viewer, store.list());

        let shared = state.clone();
        let subscription = store.subscribe(move |list| {
            let viewer = lock(&shared).viewer.clone();
            recompute(&shared, viewer, list);
        });

        Self { state, subscription }
    }

    /// Switch viewer (login, logout, role change) and recount.
    pub fn set_viewer(&self, viewer: Option<Viewer>, list: &[Notification]) {
        recompute(&self.state, viewer, list);
    }

    pub fn viewer(&self) -> Option<Viewer> {
        lock(&self.state).viewer.clone()
    }

    pub fn count(&self) -> usize {
        lock(&self.state).count
    }

    pub fn detach(self, store: &mut NotificationStore) {
        store.unsubscribe(self.subscription);
    }
}

fn lock(state: &Mutex<TrackerState>) -> std::sync::MutexGuard<'_, TrackerState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

fn recompute(state: &Mutex<TrackerState>, viewer: Option<Viewer>, list: &[Notification]) {
    let count = viewer.as_ref().map_or(0, |v| unread_count(list, v));
    let mut state = lock(state);
    state.viewer = viewer;
    state.count = count;
}
