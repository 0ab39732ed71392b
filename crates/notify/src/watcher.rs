//! Scans customers for certificates expiring within the horizon.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use tracing::{debug, info, warn};

use certwatch_core::Customer;

use crate::notification::{NotificationKind, NotificationSpec};
use crate::store::NotificationStore;
use crate::templating::{ExpiryContext, ExpiryTemplates, TemplateRenderer};

pub const DEFAULT_HORIZON_DAYS: u32 = 30;

/// Summary of one watcher pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchReport {
    pub scanned: usize,
    /// Customers without a usable expiry date.
    pub skipped: usize,
    /// Customers expiring inside the horizon.
    pub in_window: usize,
    pub emitted: usize,
}

#[derive(Debug)]
pub struct ExpiryWatcher {
    horizon_days: u32,
    templates: ExpiryTemplates,
    renderer: TemplateRenderer,
}

impl Default for ExpiryWatcher {
    fn default() -> Self {
        Self::new(DEFAULT_HORIZON_DAYS)
    }
}

impl ExpiryWatcher {
    pub fn new(horizon_days: u32) -> Self {
        Self {
            horizon_days,
            templates: ExpiryTemplates::default(),
            renderer: TemplateRenderer::new(),
        }
    }

    pub fn with_templates(mut self, templates: ExpiryTemplates) -> Self {
        self.templates = templates;
        self
    }

    pub fn horizon_days(&self) -> u32 {
        self.horizon_days
    }

    /// Last instant counted as "soon": the end of the day `horizon_days` from now.
    pub fn horizon(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let Some(end) = now.checked_add_signed(Duration::days(i64::from(self.horizon_days))) else {
            return DateTime::<Utc>::MAX_UTC;
        };
        let last_day = end.date_naive();
        last_day
            .and_hms_milli_opt(23, 59, 59, 999)
            .unwrap_or_else(|| last_day.and_time(NaiveTime::default()))
            .and_utc()
    }

    /// Emit an alert for every customer expiring in `[now, horizon]` that does
    /// not already have one for the same expiry date.
    pub fn run_pass(&self, customers: &[Customer], store: &mut NotificationStore) -> WatchReport {
        let now = store.now();
        let horizon = self.horizon(now);
        let mut report = WatchReport {
            scanned: customers.len(),
            ..WatchReport::default()
        };

        for customer in customers {
            let (Some(raw), Some(expiry)) = (customer.expiry_date.as_deref(), customer.expiry()) else {
                if customer.expiry_date.as_deref().is_some_and(|d| !d.trim().is_empty()) {
                    debug!(customer_id = %customer.id, raw = ?customer.expiry_date, "Unparsable expiry date, skipping");
                }
                report.skipped += 1;
                continue;
            };

            if expiry < now || expiry > horizon {
                continue;
            }
            report.in_window += 1;

            if store.has_expiry_alert(&customer.id, raw) {
                continue;
            }

            let spec = self.expiry_spec(customer, raw, expiry, now);
            if !store.add(spec).is_empty() {
                report.emitted += 1;
            }
        }

        if report.emitted > 0 {
            info!(
                scanned = report.scanned,
                in_window = report.in_window,
                emitted = report.emitted,
                "Certificate expiry alerts emitted"
            );
        } else {
            debug!(scanned = report.scanned, in_window = report.in_window, "Watcher pass found nothing new");
        }
        report
    }

    fn expiry_spec(
        &self,
        customer: &Customer,
        raw_expiry: &str,
        expiry: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> NotificationSpec {
        let ctx = ExpiryContext {
            customer_id: customer.id.clone(),
            customer_name: customer.customer_name.clone(),
            expiry_date: expiry.format("%Y-%m-%d").to_string(),
            days_left: (expiry.date_naive() - now.date_naive()).num_days(),
        };

        let title = self
            .renderer
            .render(&self.templates.title, &ctx)
            .unwrap_or_else(|e| {
                warn!(error = %e, "Expiry title template failed, using fallback");
                "Certificate expiring soon".to_string()
            });
        let message = self
            .renderer
            .render(&self.templates.message, &ctx)
            .unwrap_or_else(|e| {
                warn!(error = %e, "Expiry message template failed, using fallback");
                format!(
                    "The certificate for {} expires on {}.",
                    ctx.customer_name, ctx.expiry_date
                )
            });

        NotificationSpec::new(title, message)
            .kind(NotificationKind::CertificateExpiry)
            .customer(customer.id.clone(), customer.customer_name.clone())
            .expiry_date(raw_expiry)
            .path("/customers")
            .icon("certificate")
            .color("orange")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use certwatch_storage::MemoryStore;
    use chrono::TimeZone;

    use crate::clock::FixedClock;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap()
    }

    fn store() -> NotificationStore {
        NotificationStore::load(Arc::new(MemoryStore::new()), Arc::new(FixedClock::new(now())))
    }

    fn customer(id: &str, expiry: &str) -> Customer {
        Customer::new(id, format!("Customer {id}"), Some(expiry.to_string()))
    }

    #[test]
    fn horizon_is_end_of_thirtieth_day() {
        let watcher = ExpiryWatcher::default();
        let horizon = watcher.horizon(now());
        assert_eq!(
            horizon,
            Utc.with_ymd_and_hms(2026, 11, 18, 23, 59, 59).unwrap() + Duration::milliseconds(999)
        );
    }

    #[test]
    fn bounds_are_inclusive() {
        let mut store = store();
        let customers = vec![
            customer("at-now", "2026-10-19T09:30:00Z"),
            customer("end-of-horizon", "2026-11-18T23:59:59.999Z"),
            customer("past-horizon", "2026-11-19T00:00:00Z"),
            customer("already-expired", "2026-10-19T09:29:59Z"),
        ];
        let report = ExpiryWatcher::default().run_pass(&customers, &mut store);
        assert_eq!(report.in_window, 2);
        assert_eq!(report.emitted, 2);
        assert!(store.has_expiry_alert("at-now", "2026-10-19T09:30:00Z"));
        assert!(store.has_expiry_alert("end-of-horizon", "2026-11-18T23:59:59.999Z"));
    }

    #[test]
    fn missing_and_unparsable_dates_are_skipped() {
        let mut store = store();
        let customers = vec![
            Customer::new("none", "n", None),
            Customer::new("blank", "b", Some(String::new())),
            customer("garbage", "31/31/2026"),
        ];
        let report = ExpiryWatcher::default().run_pass(&customers, &mut store);
        assert_eq!(report.skipped, 3);
        assert!(store.is_empty());
    }

    #[test]
    fn message_embeds_formatted_date() {
        let mut store = store();
        ExpiryWatcher::default().run_pass(&[customer("c1", "2026-11-13T00:00:00.000Z")], &mut store);
        let n = &store.list()[0];
        assert_eq!(n.kind, NotificationKind::CertificateExpiry);
        assert_eq!(n.customer_name.as_deref(), Some("Customer c1"));
        assert!(n.message.contains("2026-11-13"), "{}", n.message);
        assert!(n.message.contains("25 days left"), "{}", n.message);
        assert!(n.is_public());
    }

    #[test]
    fn broken_template_falls_back() {
        let mut store = store();
        let watcher = ExpiryWatcher::new(30).with_templates(ExpiryTemplates {
            title: "{{ broken".into(),
            message: "{% if %}".into(),
        });
        watcher.run_pass(&[customer("c1", "2026-11-01")], &mut store);
        let n = &store.list()[0];
        assert_eq!(n.title, "Certificate expiring soon");
        assert_eq!(n.message, "The certificate for Customer c1 expires on 2026-11-01.");
    }

    #[test]
    fn oversized_horizon_saturates() {
        let watcher = ExpiryWatcher::new(u32::MAX);
        assert_eq!(watcher.horizon(now()), DateTime::<Utc>::MAX_UTC);

        let mut store = store();
        let report = watcher.run_pass(&[customer("c1", "2100-01-01")], &mut store);
        assert_eq!(report.emitted, 1);
    }

    #[test]
    fn custom_horizon() {
        let mut store = store();
        let watcher = ExpiryWatcher::new(7);
        let report = watcher.run_pass(
            &[customer("soon", "2026-10-25"), customer("later", "2026-11-01")],
            &mut store,
        );
        assert_eq!(report.emitted, 1);
        assert!(store.has_expiry_alert("soon", "2026-10-25"));
    }
}
