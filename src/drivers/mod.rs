//! Drivers Module
//!
//! Storage backends behind the [`Cache`](crate::cache::Cache) service. Every
//! driver implements the same four primitives (store, retrieve, remove,
//! flush); expiration math and payload conversion live in the cache itself.
//!
//! # Drivers
//! - [`MemoryDriver`] - process-local map
//! - [`FileDriver`] - one JSON file per key
//! - [`SessionDriver`] - entries inside a session data bag
//! - [`SharedMemoryDriver`] - process-wide store with native TTL
//! - [`MemcachedDriver`] - Memcached server
//! - [`RedisDriver`] - Redis server
//! - [`NullDriver`] - accepts everything, stores nothing

mod file;
mod memcached;
mod memory;
mod null;
mod redis;
mod session;
mod shared_memory;

use std::fmt::Debug;

use crate::cache::Value;

pub use file::FileDriver;
pub use memcached::MemcachedDriver;
pub use memory::{MemoryDriver, MemoryStore};
pub use null::NullDriver;
pub use redis::RedisDriver;
pub use session::{Session, SessionDriver};
pub use shared_memory::{SharedMemoryDriver, SharedMemoryStore};

// == Driver Trait ==
/// Primitive operations a storage backend must supply.
///
/// Keys handed to a driver are the caller's raw keys; the driver maps them
/// through [`Driver::key`] before touching its backend. Backend failures
/// must never panic or escape as errors: they degrade to `false`/`None`.
pub trait Driver: Debug + Send + Sync {
    /// Namespace prefix configured for this driver.
    fn prefix(&self) -> Option<&str>;

    /// Maps a raw key to the key used in the backend.
    ///
    /// Prepends `prefix/` when a non-empty prefix is configured.
    fn key(&self, key: &str) -> String {
        prefixed(self.prefix(), key)
    }

    /// Writes an entry, replacing any previous one.
    fn store(&self, key: &str, value: &Value) -> bool;

    /// Reads an entry. Missing or unparsable entries are `None`.
    fn retrieve(&self, key: &str) -> Option<Value>;

    /// Deletes an entry. Returns false if nothing was removed.
    fn remove(&self, key: &str) -> bool;

    /// Deletes every entry in this driver's namespace.
    fn flush(&self) -> bool;

    /// Creation timestamp of an entry, `None` if not found.
    fn created(&self, key: &str) -> Option<i64> {
        self.retrieve(key).map(|value| value.created())
    }

    /// Health probe. Never fails loudly.
    fn enabled(&self) -> bool {
        true
    }
}

/// Joins a prefix and a key with `/`, skipping empty prefixes.
pub fn prefixed(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}/{}", prefix, key),
        _ => key.to_string(),
    }
}

/// Normalizes an optional prefix so empty strings count as unset.
fn normalize_prefix(prefix: Option<String>) -> Option<String> {
    prefix.filter(|p| !p.is_empty())
}
