//! Configuration Module
//!
//! Describes how a cache is built (driver, prefix, driver options) and how
//! the HTTP front is run. [`CacheConfig`] deserializes from the same shape
//! as a cache options map:
//!
//! ```json
//! { "type": "file", "root": "/var/cache/app", "extension": "cache", "prefix": "pages" }
//! ```

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

// == Cache Config ==
/// Options for one cache instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Namespace prepended to every key
    #[serde(default)]
    pub prefix: Option<String>,
    /// Backend and its connection/location options
    #[serde(flatten)]
    pub driver: DriverConfig,
}

impl CacheConfig {
    pub fn new(driver: DriverConfig) -> Self {
        Self {
            prefix: None,
            driver,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(DriverConfig::Memory)
    }
}

// == Driver Config ==
/// Backend selection, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DriverConfig {
    Memory,
    File(FileOptions),
    /// Needs a live session handle, see `Cache::session`
    Session,
    #[serde(alias = "apcu")]
    SharedMemory,
    Memcached(MemcachedOptions),
    Redis(RedisOptions),
    Null,
}

impl DriverConfig {
    pub fn name(&self) -> &'static str {
        match self {
            DriverConfig::Memory => "memory",
            DriverConfig::File(_) => "file",
            DriverConfig::Session => "session",
            DriverConfig::SharedMemory => "shared-memory",
            DriverConfig::Memcached(_) => "memcached",
            DriverConfig::Redis(_) => "redis",
            DriverConfig::Null => "null",
        }
    }
}

/// File backend options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileOptions {
    /// Directory holding the cache files
    pub root: PathBuf,
    /// Extension appended to every file name
    #[serde(default)]
    pub extension: Option<String>,
}

impl FileOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: None,
        }
    }
}

/// Memcached backend options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemcachedOptions {
    pub host: String,
    pub port: u16,
    /// Connect/read timeout in seconds
    pub timeout: Option<u64>,
}

impl Default for MemcachedOptions {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 11211,
            timeout: None,
        }
    }
}

/// Redis backend options. Durations are in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisOptions {
    pub host: String,
    pub port: u16,
    /// Database index to select after connecting
    pub database: Option<i64>,
    pub auth: Option<RedisAuth>,
    /// Connect over TLS (`rediss://`)
    pub ssl: bool,
    /// Reuse one connection across calls instead of connecting per call
    pub persistent: bool,
    pub connect_timeout: Option<u64>,
    pub read_timeout: Option<u64>,
    /// Delay before a single reconnection attempt
    pub retry_interval: Option<u64>,
    /// Exponential reconnection schedule, takes precedence over `retry_interval`
    pub backoff: Option<BackoffOptions>,
}

impl Default for RedisOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            database: None,
            auth: None,
            ssl: false,
            persistent: false,
            connect_timeout: None,
            read_timeout: None,
            retry_interval: None,
            backoff: None,
        }
    }
}

/// Redis credentials: a bare password or an ACL user/password pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RedisAuth {
    Password(String),
    Credentials { user: String, pass: String },
}

/// Exponential backoff between reconnection attempts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffOptions {
    /// Reconnection attempts after the first failure
    pub retries: u32,
    /// First delay in milliseconds, doubled per attempt
    pub base: u64,
    /// Upper bound for a single delay in milliseconds
    pub cap: u64,
}

impl Default for BackoffOptions {
    fn default() -> Self {
        Self {
            retries: 3,
            base: 100,
            cap: 1000,
        }
    }
}

// == Server Config ==
/// HTTP front configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP server port
    pub server_port: u16,
    /// TTL in minutes for writes that do not specify one
    pub default_minutes: u32,
    /// Cache exposed by the server
    pub cache: CacheConfig,
}

impl ServerConfig {
    /// Creates a new ServerConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_DEFAULT_MINUTES` - default TTL in minutes (default: 0, forever)
    /// - `CACHE_DRIVER` - `memory`, `file`, `shared-memory`, `memcached`, `redis`, `null` (default: memory)
    /// - `CACHE_PREFIX` - key prefix
    /// - `CACHE_ROOT`, `CACHE_EXTENSION` - file driver
    /// - `CACHE_HOST`, `CACHE_PORT`, `CACHE_TIMEOUT` - memcached driver
    /// - `CACHE_HOST`, `CACHE_PORT`, `CACHE_DATABASE`, `CACHE_AUTH`, `CACHE_SSL`,
    ///   `CACHE_PERSISTENT`, `CACHE_CONNECT_TIMEOUT`, `CACHE_READ_TIMEOUT` - redis driver
    pub fn from_env() -> Self {
        let driver = match env_string("CACHE_DRIVER").as_deref() {
            None | Some("memory") => DriverConfig::Memory,
            Some("file") => DriverConfig::File(FileOptions {
                root: env_string("CACHE_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("cache")),
                extension: env_string("CACHE_EXTENSION"),
            }),
            Some("shared-memory") | Some("apcu") => DriverConfig::SharedMemory,
            Some("memcached") => {
                let defaults = MemcachedOptions::default();
                DriverConfig::Memcached(MemcachedOptions {
                    host: env_string("CACHE_HOST").unwrap_or(defaults.host),
                    port: env_parse("CACHE_PORT").unwrap_or(defaults.port),
                    timeout: env_parse("CACHE_TIMEOUT"),
                })
            }
            Some("redis") => {
                let defaults = RedisOptions::default();
                DriverConfig::Redis(RedisOptions {
                    host: env_string("CACHE_HOST").unwrap_or(defaults.host),
                    port: env_parse("CACHE_PORT").unwrap_or(defaults.port),
                    database: env_parse("CACHE_DATABASE"),
                    auth: env_string("CACHE_AUTH").map(RedisAuth::Password),
                    ssl: env_parse("CACHE_SSL").unwrap_or(false),
                    persistent: env_parse("CACHE_PERSISTENT").unwrap_or(false),
                    connect_timeout: env_parse("CACHE_CONNECT_TIMEOUT"),
                    read_timeout: env_parse("CACHE_READ_TIMEOUT"),
                    ..defaults
                })
            }
            Some("null") => DriverConfig::Null,
            Some(other) => {
                warn!("Unknown CACHE_DRIVER '{}', falling back to memory", other);
                DriverConfig::Memory
            }
        };

        Self {
            server_port: env_parse("SERVER_PORT").unwrap_or(3000),
            default_minutes: env_parse("CACHE_DEFAULT_MINUTES").unwrap_or(0),
            cache: CacheConfig {
                prefix: env_string("CACHE_PREFIX"),
                driver,
            },
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_port: 3000,
            default_minutes: 0,
            cache: CacheConfig::default(),
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
