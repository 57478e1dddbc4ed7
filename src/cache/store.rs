//! Cache Store Module
//!
//! The driver-agnostic cache. [`Cache`] wraps any [`Driver`] and adds what
//! the drivers leave out: payload (de)serialization, TTL bookkeeping, lazy
//! removal of expired entries and compute-if-absent.
//!
//! Expiration is detected on read only. An expired entry stays physically
//! stored until the next `get` for its key removes it.

use std::path::PathBuf;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::stats::StatsRecorder;
use crate::cache::{CacheStats, Value};
use crate::clock::{Clock, SystemClock};
use crate::config::{CacheConfig, DriverConfig};
use crate::drivers::{
    Driver, FileDriver, MemcachedDriver, MemoryDriver, NullDriver, RedisDriver, Session,
    SessionDriver, SharedMemoryDriver,
};
use crate::error::{CacheError, Result};

// == Expiration ==
/// When a stored entry stops being served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// Stored with a TTL of 0
    Never,
    /// Unix timestamp (seconds) of expiry
    At(i64),
}

impl Expiration {
    /// The expiry timestamp, `None` for entries that never expire.
    pub fn timestamp(&self) -> Option<i64> {
        match self {
            Expiration::Never => None,
            Expiration::At(ts) => Some(*ts),
        }
    }
}

// == Cache ==
/// A cache instance: one driver, one clock, one set of counters.
///
/// All methods take `&self`; share a `Cache` across threads with `Arc`.
#[derive(Debug)]
pub struct Cache {
    driver: Box<dyn Driver>,
    clock: Arc<dyn Clock>,
    stats: StatsRecorder,
}

impl Cache {
    // == Constructors ==
    /// Creates a cache on top of `driver`, using the system clock.
    pub fn new(driver: Box<dyn Driver>) -> Self {
        Self::with_clock(driver, Arc::new(SystemClock))
    }

    /// Creates a cache with an injected clock.
    pub fn with_clock(driver: Box<dyn Driver>, clock: Arc<dyn Clock>) -> Self {
        Self {
            driver,
            clock,
            stats: StatsRecorder::default(),
        }
    }

    pub fn memory(prefix: Option<String>) -> Self {
        Self::new(Box::new(MemoryDriver::new(prefix)))
    }

    pub fn file(
        root: impl Into<PathBuf>,
        extension: Option<String>,
        prefix: Option<String>,
    ) -> Result<Self> {
        Ok(Self::new(Box::new(FileDriver::new(root, extension, prefix)?)))
    }

    pub fn session(session: Session, prefix: Option<String>) -> Self {
        Self::new(Box::new(SessionDriver::new(session, prefix)))
    }

    pub fn shared_memory(prefix: Option<String>) -> Self {
        Self::new(Box::new(SharedMemoryDriver::new(prefix)))
    }

    pub fn null() -> Self {
        Self::new(Box::new(NullDriver::new()))
    }

    /// Builds a cache from configuration.
    ///
    /// The session driver cannot be built this way since it needs a live
    /// [`Session`]; use [`Cache::session`] instead.
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        let prefix = config.prefix.clone();
        let driver: Box<dyn Driver> = match &config.driver {
            DriverConfig::Memory => Box::new(MemoryDriver::new(prefix)),
            DriverConfig::File(options) => Box::new(FileDriver::new(
                options.root.clone(),
                options.extension.clone(),
                prefix,
            )?),
            DriverConfig::Session => {
                return Err(CacheError::Config(
                    "the session driver needs a session handle, use Cache::session".to_string(),
                ))
            }
            DriverConfig::SharedMemory => Box::new(SharedMemoryDriver::new(prefix)),
            DriverConfig::Memcached(options) => {
                Box::new(MemcachedDriver::new(options.clone(), prefix))
            }
            DriverConfig::Redis(options) => Box::new(RedisDriver::new(options.clone(), prefix)),
            DriverConfig::Null => Box::new(NullDriver::new()),
        };

        info!(
            driver = config.driver.name(),
            prefix = ?config.prefix,
            "Cache created"
        );
        Ok(Self::new(driver))
    }

    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    // == Keys ==
    /// Backend key for a raw key.
    pub fn key(&self, key: &str) -> String {
        self.driver.key(key)
    }

    pub fn prefix(&self) -> Option<&str> {
        self.driver.prefix()
    }

    // == Write ==
    /// Stores `value` under `key` for `minutes` (0 = forever).
    ///
    /// Returns the driver's verdict; a backend failure is `Ok(false)`.
    /// Fails only when `value` cannot be represented as JSON.
    pub fn set<T>(&self, key: &str, value: &T, minutes: u32) -> Result<bool>
    where
        T: Serialize + ?Sized,
    {
        let payload = serde_json::to_value(value)?;
        let value = Value::with_created(payload, minutes, self.clock.now());
        Ok(self.driver.store(key, &value))
    }

    // == Read ==
    /// Raw envelope as stored, expired or not.
    pub fn retrieve(&self, key: &str) -> Option<Value> {
        self.driver.retrieve(key)
    }

    /// True when the key is unknown or its TTL has elapsed.
    pub fn expired(&self, key: &str) -> bool {
        match self.retrieve(key) {
            Some(value) => !self.is_live(&value),
            None => true,
        }
    }

    pub fn exists(&self, key: &str) -> bool {
        !self.expired(key)
    }

    /// Returns the payload of a live entry.
    ///
    /// Expired entries are removed on the way. A payload that does not
    /// deserialize into `T` counts as a miss but stays stored.
    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let Some(value) = self.live(key) else {
            self.stats.record_miss();
            return None;
        };

        match serde_json::from_value(value.into_value()) {
            Ok(payload) => {
                self.stats.record_hit();
                Some(payload)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cached payload has an unexpected shape");
                self.stats.record_miss();
                None
            }
        }
    }

    /// Returns the envelope of a live entry in one driver read.
    ///
    /// Expired entries are removed on the way, like [`Cache::get`].
    pub fn get_entry(&self, key: &str) -> Option<Value> {
        let value = self.live(key);
        match value {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        value
    }

    /// Like [`Cache::get`], falling back to `default` on a miss.
    pub fn get_or<T>(&self, key: &str, default: T) -> T
    where
        T: DeserializeOwned,
    {
        self.get(key).unwrap_or(default)
    }

    /// Creation timestamp, `None` if the key is unknown.
    pub fn created(&self, key: &str) -> Option<i64> {
        self.driver.created(key)
    }

    /// Same as [`Cache::created`]; entries are replaced, never modified in place.
    pub fn modified(&self, key: &str) -> Option<i64> {
        self.created(key)
    }

    /// Expiry of a stored entry, `None` if the key is unknown.
    pub fn expires(&self, key: &str) -> Option<Expiration> {
        self.retrieve(key).map(|value| match value.expires() {
            Some(ts) => Expiration::At(ts),
            None => Expiration::Never,
        })
    }

    // == Get Or Set ==
    /// Returns the cached value, or computes, stores and returns it.
    ///
    /// `producer` runs at most once per call and only on a miss. There is no
    /// locking: concurrent callers missing at the same time each run it.
    /// A stored JSON `null` counts as a miss, so a producer returning a
    /// value that serializes to `null` runs on every call.
    pub fn get_or_set<T, F>(&self, key: &str, producer: F, minutes: u32) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        if let Some(value) = self.live(key) {
            if !value.value().is_null() {
                match serde_json::from_value(value.into_value()) {
                    Ok(payload) => {
                        self.stats.record_hit();
                        return Ok(payload);
                    }
                    Err(e) => {
                        debug!(key = %key, error = %e, "Recomputing payload with unexpected shape");
                    }
                }
            }
        }

        self.stats.record_miss();
        let payload = producer();
        if !self.set(key, &payload, minutes)? {
            debug!(key = %key, "Computed value was not stored");
        }
        Ok(payload)
    }

    // == Delete ==
    /// Removes an entry. False when nothing was removed.
    pub fn remove(&self, key: &str) -> bool {
        self.driver.remove(key)
    }

    /// Removes every entry in this cache's namespace.
    pub fn flush(&self) -> bool {
        self.driver.flush()
    }

    // == Health ==
    pub fn enabled(&self) -> bool {
        self.driver.enabled()
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    // == Helpers ==
    fn is_live(&self, value: &Value) -> bool {
        match value.expires() {
            Some(expires) => self.clock.now() < expires,
            None => true,
        }
    }

    /// Retrieves an entry, dropping it if it has expired.
    fn live(&self, key: &str) -> Option<Value> {
        let Some(value) = self.retrieve(key) else {
            debug!(key = %key, "Cache miss");
            return None;
        };

        if !self.is_live(&value) {
            debug!(key = %key, expires = ?value.expires(), "Removing expired entry");
            self.driver.remove(key);
            return None;
        }

        debug!(key = %key, "Cache hit");
        Some(value)
    }
}
