use crate::error::AppError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::collections::BTreeMap;

pub mod document_store;
pub mod json_store;
pub mod schedule_store;

/// String-valued persistent storage, the shape of the device's local store.
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, AppError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), AppError>;
    fn remove_item(&self, key: &str) -> Result<(), AppError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RefCell<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), AppError> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

/// Reads a JSON list stored under `key`; a missing key is an empty list.
pub fn read_list<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Vec<T>, AppError> {
    match store.get_item(key)? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(Vec::new()),
    }
}

pub fn write_list<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    items: &[T],
) -> Result<(), AppError> {
    let raw = serde_json::to_string(items)?;
    store.set_item(key, &raw)
}

#[cfg(test)]
mod tests {
    use super::{KeyValueStore, MemoryStore, read_list, write_list};

    #[test]
    fn read_list_defaults_to_empty() {
        let store = MemoryStore::new();
        let items: Vec<String> = read_list(&store, "reminders").unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn write_then_read_list() {
        let store = MemoryStore::new();
        write_list(&store, "names", &["a".to_string(), "b".to_string()]).unwrap();

        let items: Vec<String> = read_list(&store, "names").unwrap();
        assert_eq!(items, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(store.get_item("names").unwrap().as_deref(), Some("[\"a\",\"b\"]"));
    }

    #[test]
    fn read_list_rejects_non_list_payload() {
        let store = MemoryStore::new();
        store.set_item("names", "{\"a\":1}").unwrap();

        let err = read_list::<String>(&store, "names").unwrap_err();
        assert_eq!(err.code(), "invalid_data");
    }
}
