//! Memory Driver
//!
//! Keeps entries in a lock-protected `HashMap`. Entries live as long as the
//! process; nothing is persisted.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{normalize_prefix, Driver};
use crate::cache::Value;

// == Memory Store ==
/// Shareable backing map. Clones point at the same entries, so several
/// caches with different prefixes can live in one store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of physically stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Whether a backend key is physically present.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }
}

// == Memory Driver ==
#[derive(Debug, Default)]
pub struct MemoryDriver {
    store: MemoryStore,
    prefix: Option<String>,
}

impl MemoryDriver {
    /// Creates a driver with its own private store.
    pub fn new(prefix: Option<String>) -> Self {
        Self::with_store(MemoryStore::new(), prefix)
    }

    /// Creates a driver on top of an existing (possibly shared) store.
    pub fn with_store(store: MemoryStore, prefix: Option<String>) -> Self {
        Self {
            store,
            prefix: normalize_prefix(prefix),
        }
    }

    pub fn store_handle(&self) -> &MemoryStore {
        &self.store
    }
}

impl Driver for MemoryDriver {
    fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    fn store(&self, key: &str, value: &Value) -> bool {
        self.store
            .entries
            .write()
            .insert(self.key(key), value.clone());
        true
    }

    fn retrieve(&self, key: &str) -> Option<Value> {
        self.store.entries.read().get(&self.key(key)).cloned()
    }

    fn remove(&self, key: &str) -> bool {
        self.store.entries.write().remove(&self.key(key)).is_some()
    }

    fn flush(&self) -> bool {
        let mut entries = self.store.entries.write();
        match &self.prefix {
            Some(prefix) => {
                let namespace = format!("{}/", prefix);
                entries.retain(|key, _| !key.starts_with(&namespace));
            }
            None => entries.clear(),
        }
        true
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn value(payload: &str) -> Value {
        Value::with_created(json!(payload), 0, 1000)
    }

    #[test]
    fn test_store_and_retrieve() {
        let driver = MemoryDriver::new(None);

        assert!(driver.store("foo", &value("bar")));
        assert_eq!(driver.retrieve("foo"), Some(value("bar")));
        assert_eq!(driver.retrieve("missing"), None);
    }

    #[test]
    fn test_remove() {
        let driver = MemoryDriver::new(None);
        driver.store("foo", &value("bar"));

        assert!(driver.remove("foo"));
        assert!(!driver.remove("foo"));
        assert_eq!(driver.retrieve("foo"), None);
    }

    #[test]
    fn test_prefix_applied_to_backend_key() {
        let driver = MemoryDriver::new(Some("pages".into()));
        driver.store("foo", &value("bar"));

        assert!(driver.store_handle().contains("pages/foo"));
        assert!(!driver.store_handle().contains("foo"));
    }

    #[test]
    fn test_flush_without_prefix_clears_everything() {
        let driver = MemoryDriver::new(None);
        driver.store("a", &value("1"));
        driver.store("b", &value("2"));

        assert!(driver.flush());
        assert!(driver.store_handle().is_empty());
    }

    #[test]
    fn test_flush_with_prefix_keeps_other_namespaces() {
        let store = MemoryStore::new();
        let one = MemoryDriver::with_store(store.clone(), Some("test1".into()));
        let two = MemoryDriver::with_store(store.clone(), Some("test2".into()));

        one.store("foo", &value("one"));
        two.store("foo", &value("two"));
        assert_eq!(store.len(), 2);

        assert!(one.flush());
        assert_eq!(one.retrieve("foo"), None);
        assert_eq!(two.retrieve("foo"), Some(value("two")));
    }

    #[test]
    fn test_concurrent_writers() {
        let driver = Arc::new(MemoryDriver::new(None));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let driver = Arc::clone(&driver);
                std::thread::spawn(move || {
                    for j in 0..50 {
                        driver.store(&format!("{}-{}", i, j), &value("x"));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(driver.store_handle().len(), 400);
    }
}
