pub mod backend;
pub mod error;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

pub use backend::{FileStore, KeyValueStore, MemoryStore};
pub use error::StorageError;

/// Key holding the serialized notification list.
pub const NOTIFICATIONS_KEY: &str = "notifications";

/// Key holding the last successfully fetched customer list.
pub const CUSTOMERS_KEY: &str = "customers";

/// Open the configured store. Always file-backed under `storage.data_dir`.
pub fn open_from_config(
    config: &certwatch_core::Config,
) -> Result<Arc<dyn KeyValueStore>, StorageError> {
    let store = FileStore::new(&config.storage.data_dir)?;
    Ok(Arc::new(store))
}

/// Load a JSON value, falling back to `T::default()` when the key is missing,
/// unreadable or holds something that does not parse.
pub fn read_json_or_default<T>(store: &dyn KeyValueStore, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(e) => {
            warn!(key, backend = store.backend_name(), error = %e, "Failed to read stored value, starting empty");
            return T::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(key, error = %e, "Stored value is corrupt, starting empty");
            T::default()
        }
    }
}

/// Serialize and write a value under `key`.
pub fn write_json<T>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<(), StorageError>
where
    T: Serialize + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_value_reads_as_default() {
        let store = MemoryStore::new();
        store.set(NOTIFICATIONS_KEY, "{not json").unwrap();
        let list: Vec<String> = read_json_or_default(&store, NOTIFICATIONS_KEY);
        assert!(list.is_empty());
    }

    #[test]
    fn missing_value_reads_as_default() {
        let store = MemoryStore::new();
        let list: Vec<String> = read_json_or_default(&store, CUSTOMERS_KEY);
        assert!(list.is_empty());
    }

    #[test]
    fn write_then_read() {
        let store = MemoryStore::new();
        write_json(&store, CUSTOMERS_KEY, &vec!["a".to_string(), "b".to_string()]).unwrap();
        let list: Vec<String> = read_json_or_default(&store, CUSTOMERS_KEY);
        assert_eq!(list, vec!["a", "b"]);
    }
}
