//! Memcached Driver
//!
//! Talks to a Memcached server through the `memcache` client. The
//! connection is opened lazily and re-attempted on the next call after a
//! failed connect; once connected, the client's pool replaces broken
//! connections. An unreachable server makes every operation return
//! `false`/`None` instead of raising.

use std::sync::Arc;

use memcache::Client;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{normalize_prefix, Driver};
use crate::cache::Value;
use crate::config::MemcachedOptions;

// == Memcached Driver ==
pub struct MemcachedDriver {
    url: String,
    client: Mutex<Option<Arc<Client>>>,
    prefix: Option<String>,
}

impl MemcachedDriver {
    // == Constructor ==
    pub fn new(options: MemcachedOptions, prefix: Option<String>) -> Self {
        let url = connection_url(&options);
        info!(url = %url, "Memcached cache configured");

        Self {
            url,
            client: Mutex::new(None),
            prefix: normalize_prefix(prefix),
        }
    }

    /// Returns the live client, connecting first if needed.
    fn client(&self) -> Option<Arc<Client>> {
        let mut slot = self.client.lock();
        if let Some(client) = slot.as_ref() {
            return Some(Arc::clone(client));
        }

        match Client::connect(self.url.as_str()) {
            Ok(client) => {
                let client = Arc::new(client);
                *slot = Some(Arc::clone(&client));
                Some(client)
            }
            Err(e) => {
                warn!(url = %self.url, error = %e, "Memcached connection failed");
                None
            }
        }
    }

    fn run<T>(
        &self,
        operation: &str,
        command: impl FnOnce(&Client) -> Result<T, memcache::MemcacheError>,
    ) -> Option<T> {
        let client = self.client()?;
        match command(&client) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(operation, error = %e, "Memcached command failed");
                None
            }
        }
    }
}

impl std::fmt::Debug for MemcachedDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemcachedDriver")
            .field("url", &self.url)
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl Driver for MemcachedDriver {
    fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    fn store(&self, key: &str, value: &Value) -> bool {
        let key = self.key(key);
        let json = value.to_json();
        let expiration = native_expiration(value);

        self.run("store", |client| client.set(&key, json.as_str(), expiration))
            .is_some()
    }

    fn retrieve(&self, key: &str) -> Option<Value> {
        let key = self.key(key);
        let json = self
            .run("retrieve", |client| client.get::<String>(&key))
            .flatten()?;

        let value = Value::from_json(&json);
        if value.is_none() {
            debug!(key = %key, "Ignoring malformed Memcached entry");
        }
        value
    }

    fn remove(&self, key: &str) -> bool {
        let key = self.key(key);
        self.run("remove", |client| client.delete(&key))
            .unwrap_or(false)
    }

    /// Flushes the whole server; Memcached cannot flush by prefix.
    fn flush(&self) -> bool {
        self.run("flush", |client| client.flush()).is_some()
    }

    fn enabled(&self) -> bool {
        self.run("version", |client| client.version())
            .is_some_and(|versions| !versions.is_empty())
    }
}

/// Memcached reads expirations above 30 days as absolute unix times.
const RELATIVE_EXPIRATION_LIMIT: u64 = 30 * 24 * 3600;

/// Expiration argument for `set`: relative seconds, or an absolute
/// timestamp for long TTLs. 0 means no native expiry.
fn native_expiration(value: &Value) -> u32 {
    let seconds = u64::from(value.minutes()) * 60;
    if seconds <= RELATIVE_EXPIRATION_LIMIT {
        return seconds as u32;
    }
    value
        .expires()
        .and_then(|expires| u32::try_from(expires).ok())
        .unwrap_or(0)
}

/// Builds a `memcache://` URL from the options.
fn connection_url(options: &MemcachedOptions) -> String {
    let mut url = format!("memcache://{}:{}", options.host, options.port);
    if let Some(timeout) = options.timeout {
        url.push_str(&format!("?timeout={}", timeout));
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_connection_url() {
        assert_eq!(
            connection_url(&MemcachedOptions::default()),
            "memcache://localhost:11211"
        );

        let options = MemcachedOptions {
            host: "10.0.0.5".into(),
            port: 11212,
            timeout: Some(2),
        };
        assert_eq!(connection_url(&options), "memcache://10.0.0.5:11212?timeout=2");
    }

    #[test]
    fn test_native_expiration() {
        assert_eq!(native_expiration(&Value::with_created(json!(1), 0, 1000)), 0);
        assert_eq!(native_expiration(&Value::with_created(json!(1), 10, 1000)), 600);
        assert_eq!(
            native_expiration(&Value::with_created(json!(1), 43_200, 1000)),
            2_592_000
        );
        assert_eq!(
            native_expiration(&Value::with_created(json!(1), 43_201, 1000)),
            1000 + 2_592_060
        );
    }

    #[test]
    fn test_key_uses_cache_prefix() {
        let driver = MemcachedDriver::new(MemcachedOptions::default(), Some("pages".into()));
        assert_eq!(driver.key("foo"), "pages/foo");
    }

    /// Slow: every call retries the connection and waits out the pool timeout.
    #[test]
    fn test_unreachable_server_degrades() {
        let options = MemcachedOptions {
            host: "127.0.0.1".into(),
            port: 1,
            timeout: Some(1),
        };
        let driver = MemcachedDriver::new(options, None);
        let value = Value::with_created(json!("bar"), 10, 1000);

        assert!(!driver.enabled());
        assert!(!driver.store("foo", &value));
        assert_eq!(driver.retrieve("foo"), None);
        assert!(!driver.remove("foo"));
        assert!(!driver.flush());
        assert!(driver.client.lock().is_none());
    }
}
