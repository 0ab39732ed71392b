//! Audience expansion and supersession of stale domain alerts.

use crate::notification::{Audience, Notification, NotificationSpec};

/// Remove stored records that the incoming spec supersedes.
///
/// Applies only when the spec carries a `customer_id`: records with the same
/// customer and type go away, except those with an identical `expiry_date`
/// when the spec has one. Returns how many records were removed.
pub fn supersede(existing: &mut Vec<Notification>, spec: &NotificationSpec) -> usize {
    let Some(customer_id) = spec.customer_id.as_deref() else {
        return 0;
    };
    let kind = spec.effective_kind();
    let before = existing.len();

    existing.retain(|n| {
        let same_event = n.customer_id.as_deref() == Some(customer_id) && n.kind == kind;
        if !same_event {
            return true;
        }
        match spec.expiry_date.as_deref() {
            Some(expiry) => n.expiry_date.as_deref() == Some(expiry),
            None => false,
        }
    });

    before - existing.len()
}

/// Expand a base record into the records to store for `audience`.
pub fn expand(base: Notification, audience: Audience) -> Vec<Notification> {
    match audience {
        Audience::User(username) => vec![Notification {
            for_user: Some(username),
            ..base
        }],
        Audience::Users(usernames) => usernames
            .into_iter()
            .map(|username| Notification {
                id: format!("{}-user-{}", base.id, username),
                for_user: Some(username),
                ..base.clone()
            })
            .collect(),
        Audience::Roles(roles) => vec![Notification {
            id: format!("{}-roles", base.id),
            for_roles: Some(roles),
            ..base
        }],
        Audience::Public => vec![base],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::NotificationKind;
    use chrono::Utc;

    fn base(id: &str) -> Notification {
        let (n, _) = NotificationSpec::new("t", "m").into_base(id.to_string(), Utc::now());
        n
    }

    fn expiry_record(id: &str, customer: &str, expiry: &str) -> Notification {
        Notification {
            kind: NotificationKind::CertificateExpiry,
            customer_id: Some(customer.into()),
            expiry_date: Some(expiry.into()),
            ..base(id)
        }
    }

    #[test]
    fn users_audience_expands_per_user() {
        let records = expand(base("100"), Audience::Users(vec!["alice".into(), "bob".into()]));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "100-user-alice");
        assert_eq!(records[0].for_user.as_deref(), Some("alice"));
        assert_eq!(records[1].id, "100-user-bob");
        assert!(records.iter().all(|r| r.for_users.is_none()));
    }

    #[test]
    fn empty_users_audience_stores_nothing() {
        assert!(expand(base("100"), Audience::Users(Vec::new())).is_empty());
    }

    #[test]
    fn roles_audience_is_one_record() {
        let records = expand(base("100"), Audience::Roles(vec!["admin".into(), "clerk".into()]));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "100-roles");
        assert_eq!(records[0].for_roles.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn user_and_public_keep_base_id() {
        let user = expand(base("100"), Audience::User("mgr1".into()));
        assert_eq!(user[0].id, "100");
        assert_eq!(user[0].for_user.as_deref(), Some("mgr1"));

        let public = expand(base("101"), Audience::Public);
        assert_eq!(public.len(), 1);
        assert!(public[0].is_public());
    }

    #[test]
    fn changed_expiry_supersedes_old_alert() {
        let mut stored = vec![
            expiry_record("1", "c1", "2026-11-01"),
            expiry_record("2", "c2", "2026-11-01"),
        ];
        let spec = NotificationSpec::new("t", "m")
            .kind(NotificationKind::CertificateExpiry)
            .customer("c1", "Ahmed")
            .expiry_date("2026-11-20");

        assert_eq!(supersede(&mut stored, &spec), 1);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].customer_id.as_deref(), Some("c2"));
    }

    #[test]
    fn identical_expiry_is_retained() {
        let mut stored = vec![expiry_record("1", "c1", "2026-11-01")];
        let spec = NotificationSpec::new("t", "m")
            .kind(NotificationKind::CertificateExpiry)
            .customer("c1", "Ahmed")
            .expiry_date("2026-11-01");
        assert_eq!(supersede(&mut stored, &spec), 0);
        assert_eq!(stored.len(), 1);
    }

    #[test]
    fn customer_spec_without_expiry_replaces_all_of_that_type() {
        let mut stored = vec![
            expiry_record("1", "c1", "2026-11-01"),
            Notification {
                customer_id: Some("c1".into()),
                ..base("2")
            },
        ];
        let spec = NotificationSpec::new("t", "m")
            .kind(NotificationKind::CertificateExpiry)
            .customer("c1", "Ahmed");
        assert_eq!(supersede(&mut stored, &spec), 1);
        // The info record for c1 has a different type and survives.
        assert_eq!(stored[0].id, "2");
    }

    #[test]
    fn spec_without_customer_touches_nothing() {
        let mut stored = vec![expiry_record("1", "c1", "2026-11-01")];
        let spec = NotificationSpec::new("t", "m").kind(NotificationKind::CertificateExpiry);
        assert_eq!(supersede(&mut stored, &spec), 0);
        assert_eq!(stored.len(), 1);
    }
}
