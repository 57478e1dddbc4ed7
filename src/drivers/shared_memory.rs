//! Shared Memory Driver
//!
//! Process-wide store shared by every driver instance, in the spirit of an
//! opcode-cache user store. Each entry carries a native TTL as a second,
//! redundant expiry next to the cache's own logical expiration.

use std::fmt;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use moka::sync::Cache;
use moka::Expiry;
use tracing::debug;

use super::{normalize_prefix, Driver};
use crate::cache::Value;

static GLOBAL_STORE: OnceLock<SharedMemoryStore> = OnceLock::new();

// == Shared Entry ==
#[derive(Debug, Clone)]
struct SharedEntry {
    json: String,
    ttl: Option<Duration>,
}

/// Per-entry expiry policy; overwrites restart the TTL.
struct NativeTtl;

impl Expiry<String, SharedEntry> for NativeTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &SharedEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &SharedEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

// == Shared Memory Store ==
/// Handle to a shared store. Clones point at the same entries.
#[derive(Clone)]
pub struct SharedMemoryStore {
    entries: Cache<String, SharedEntry>,
}

impl SharedMemoryStore {
    /// Creates a fresh, isolated store.
    pub fn new() -> Self {
        Self {
            entries: Cache::builder().expire_after(NativeTtl).build(),
        }
    }

    /// The process-wide store used by [`SharedMemoryDriver::new`].
    pub fn global() -> Self {
        GLOBAL_STORE.get_or_init(Self::new).clone()
    }

    /// Whether a backend key is present and not natively expired.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn clear_namespace(&self, namespace: &str) {
        let keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(key, _)| key.starts_with(namespace))
            .map(|(key, _)| key.to_string())
            .collect();

        for key in keys {
            self.entries.invalidate(&key);
        }
    }
}

impl Default for SharedMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SharedMemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedMemoryStore")
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

// == Shared Memory Driver ==
#[derive(Debug)]
pub struct SharedMemoryDriver {
    store: SharedMemoryStore,
    prefix: Option<String>,
}

impl SharedMemoryDriver {
    /// Creates a driver on the process-wide store.
    pub fn new(prefix: Option<String>) -> Self {
        Self::with_store(SharedMemoryStore::global(), prefix)
    }

    pub fn with_store(store: SharedMemoryStore, prefix: Option<String>) -> Self {
        Self {
            store,
            prefix: normalize_prefix(prefix),
        }
    }

    pub fn store_handle(&self) -> &SharedMemoryStore {
        &self.store
    }
}

impl Driver for SharedMemoryDriver {
    fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    fn store(&self, key: &str, value: &Value) -> bool {
        let ttl = match value.minutes() {
            0 => None,
            minutes => Some(Duration::from_secs(u64::from(minutes) * 60)),
        };
        let entry = SharedEntry {
            json: value.to_json(),
            ttl,
        };
        self.store.entries.insert(self.key(key), entry);
        true
    }

    fn retrieve(&self, key: &str) -> Option<Value> {
        let key = self.key(key);
        let entry = self.store.entries.get(&key)?;
        let value = Value::from_json(&entry.json);
        if value.is_none() {
            debug!(key = %key, "Ignoring malformed shared memory entry");
        }
        value
    }

    fn remove(&self, key: &str) -> bool {
        self.store.entries.remove(&self.key(key)).is_some()
    }

    fn flush(&self) -> bool {
        match &self.prefix {
            Some(prefix) => self.store.clear_namespace(&format!("{}/", prefix)),
            None => self.store.entries.invalidate_all(),
        }
        true
    }
}
