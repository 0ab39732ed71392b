//! In-app notifications for the certificate management back office.
//!
//! This crate provides:
//! - `NotificationStore`: the persisted, newest-first notification list
//! - `Audience` targeting and supersession of stale expiry alerts
//! - `ExpiryWatcher`: raises alerts for certificates expiring soon
//! - Read-state helpers and `UnreadTracker` for per-viewer unread counts

pub mod clock;
pub mod error;
pub mod notification;
pub mod read_state;
pub mod store;
pub mod targeting;
pub mod templating;
pub mod watcher;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::NotifyError;
pub use notification::{Audience, Notification, NotificationKind, NotificationSpec};
pub use read_state::{is_visible_to, unread_count, visible_to, UnreadTracker, Viewer};
pub use store::{NotificationStore, SubscriptionId};
pub use templating::{ExpiryTemplates, TemplateRenderer};
pub use watcher::{ExpiryWatcher, WatchReport, DEFAULT_HORIZON_DAYS};
