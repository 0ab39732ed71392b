use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;

/// A customer record as served by the customer-management backend.
///
/// Only the fields the expiry watcher needs are modelled; anything else the
/// backend sends is ignored on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub customer_name: String,
    /// ISO date or date-time string, kept verbatim. Non-string values are
    /// treated as missing.
    #[serde(
        default,
        deserialize_with = "string_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiry_date: Option<String>,
}

impl Customer {
    pub fn new(id: impl Into<String>, name: impl Into<String>, expiry_date: Option<String>) -> Self {
        Self {
            id: id.into(),
            customer_name: name.into(),
            expiry_date,
        }
    }

    /// Parsed certificate expiry. `None` when the date is missing, blank or
    /// unparsable.
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        let raw = self.expiry_date.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        parse_expiry_date(raw).ok()
    }

    /// Read a JSON array of customers from disk.
    pub fn list_from_json_file(path: &Path) -> Result<Vec<Customer>, CoreError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(de)?.unwrap_or_default())
}

fn string_or_none<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    match serde_json::Value::deserialize(de)? {
        serde_json::Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

/// Parse an expiry date string.
///
/// Accepts RFC 3339 date-times, naive `YYYY-MM-DDTHH:MM:SS[.fff]` (taken as
/// UTC) and plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_expiry_date(raw: &str) -> Result<DateTime<Utc>, CoreError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(CoreError::InvalidDate(raw.to_string()))
}
