//! Notification records and the specs callers use to request them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::NotifyError;

pub const DEFAULT_PATH: &str = "/";
pub const DEFAULT_ICON: &str = "bell";
pub const DEFAULT_COLOR: &str = "blue";

fn default_path() -> String {
    DEFAULT_PATH.to_string()
}

fn default_icon() -> String {
    DEFAULT_ICON.to_string()
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

/// Notification type tag. The set is open: unknown tags are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationKind {
    CertificateExpiry,
    TripAdded,
    InvoiceCreated,
    #[default]
    Info,
    Other(String),
}

impl NotificationKind {
    pub fn as_str(&self) -> &str {
        match self {
            NotificationKind::CertificateExpiry => "certificate_expiry",
            NotificationKind::TripAdded => "trip-added",
            NotificationKind::InvoiceCreated => "invoice-created",
            NotificationKind::Info => "info",
            NotificationKind::Other(tag) => tag,
        }
    }
}

impl From<String> for NotificationKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "certificate_expiry" => NotificationKind::CertificateExpiry,
            "trip-added" => NotificationKind::TripAdded,
            "invoice-created" => NotificationKind::InvoiceCreated,
            "info" | "" => NotificationKind::Info,
            _ => NotificationKind::Other(tag),
        }
    }
}

impl From<&str> for NotificationKind {
    fn from(tag: &str) -> Self {
        NotificationKind::from(tag.to_string())
    }
}

impl From<NotificationKind> for String {
    fn from(kind: NotificationKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who a notification is meant for. Exactly one shape per request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Audience {
    /// A single username.
    User(String),
    /// Several usernames; stored as one record per user.
    Users(Vec<String>),
    /// Everyone holding one of these roles; stored as a single record.
    Roles(Vec<String>),
    /// Visible to every viewer.
    #[default]
    Public,
}

/// A stored notification, serialized with the field names the web client
/// persisted (`forUser`, `createdAt`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: NotificationKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default = "default_color")]
    pub color: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_user: Option<String>,
    /// Only present on records written by older clients; new records are
    /// expanded into one `for_user` record each.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_users: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_roles: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
}

impl Notification {
    /// True when no targeting field is set.
    pub fn is_public(&self) -> bool {
        self.for_user.is_none() && self.for_users.is_none() && self.for_roles.is_none()
    }

    /// Whether this is the expiry alert for exactly this customer and date.
    pub fn is_expiry_alert_for(&self, customer_id: &str, expiry_date: &str) -> bool {
        self.kind == NotificationKind::CertificateExpiry
            && self.customer_id.as_deref() == Some(customer_id)
            && self.expiry_date.as_deref() == Some(expiry_date)
    }
}

/// A request to create a notification. Everything not set here is filled in
/// by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationSpec {
    pub kind: Option<NotificationKind>,
    pub title: String,
    pub message: String,
    pub path: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub audience: Audience,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub expiry_date: Option<String>,
}

impl NotificationSpec {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn kind(mut self, kind: impl Into<NotificationKind>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn audience(mut self, audience: Audience) -> Self {
        self.audience = audience;
        self
    }

    pub fn for_user(self, username: impl Into<String>) -> Self {
        self.audience(Audience::User(username.into()))
    }

    pub fn for_users<I, S>(self, usernames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audience(Audience::Users(usernames.into_iter().map(Into::into).collect()))
    }

    pub fn for_roles<I, S>(self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audience(Audience::Roles(roles.into_iter().map(Into::into).collect()))
    }

    pub fn customer(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.customer_id = Some(id.into());
        self.customer_name = Some(name.into());
        self
    }

    pub fn expiry_date(mut self, expiry_date: impl Into<String>) -> Self {
        self.expiry_date = Some(expiry_date.into());
        self
    }

    /// The type this spec will be stored with.
    pub fn effective_kind(&self) -> NotificationKind {
        self.kind.clone().unwrap_or_default()
    }

    /// Build the untargeted base record. Audience is applied by
    /// [`crate::targeting::expand`].
    pub(crate) fn into_base(self, id: String, now: DateTime<Utc>) -> (Notification, Audience) {
        let base = Notification {
            id,
            kind: self.kind.unwrap_or_default(),
            title: self.title,
            message: self.message,
            path: self.path.unwrap_or_else(default_path),
            icon: self.icon.unwrap_or_else(default_icon),
            color: self.color.unwrap_or_else(default_color),
            created_at: now,
            read: false,
            for_user: None,
            for_users: None,
            for_roles: None,
            customer_id: self.customer_id,
            customer_name: self.customer_name,
            expiry_date: self.expiry_date,
        };
        (base, self.audience)
    }

    /// Build a spec from loosely-typed JSON, the shape other features emit.
    ///
    /// When more than one targeting field is present, the first of
    /// `forUser`, `forUsers`, `forRoles` wins.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, NotifyError> {
        if !value.is_object() {
            return Err(NotifyError::InvalidSpec(format!(
                "expected an object, got {}",
                json_type_name(value)
            )));
        }
        let raw: RawSpec = serde_json::from_value(value.clone())
            .map_err(|e| NotifyError::InvalidSpec(e.to_string()))?;

        let targeting_fields = [
            raw.for_user.is_some(),
            raw.for_users.is_some(),
            raw.for_roles.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();
        if targeting_fields > 1 {
            tracing::warn!(
                fields = targeting_fields,
                "Notification spec sets several targeting fields, using the first"
            );
        }

        let audience = if let Some(user) = raw.for_user {
            Audience::User(user)
        } else if let Some(users) = raw.for_users {
            Audience::Users(users)
        } else if let Some(roles) = raw.for_roles {
            Audience::Roles(roles)
        } else {
            Audience::Public
        };

        Ok(Self {
            kind: raw.kind.map(NotificationKind::from),
            title: raw.title.unwrap_or_default(),
            message: raw.message.unwrap_or_default(),
            path: raw.path,
            icon: raw.icon,
            color: raw.color,
            audience,
            customer_id: raw.customer_id,
            customer_name: raw.customer_name,
            expiry_date: raw.expiry_date,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSpec {
    #[serde(rename = "type")]
    kind: Option<String>,
    title: Option<String>,
    message: Option<String>,
    path: Option<String>,
    icon: Option<String>,
    color: Option<String>,
    for_user: Option<String>,
    for_users: Option<Vec<String>>,
    for_roles: Option<Vec<String>>,
    customer_id: Option<String>,
    customer_name: Option<String>,
    expiry_date: Option<String>,
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
