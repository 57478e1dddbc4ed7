//! Mini Cache - a cache abstraction layer with pluggable drivers
//!
//! One [`Cache`] interface over memory, file, session, shared memory,
//! Memcached, Redis and null backends, with lazy TTL expiration, key
//! prefixing and compute-if-absent. A small HTTP front is included.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod drivers;
pub mod error;
pub mod models;

pub use api::AppState;
pub use cache::{Cache, CacheStats, Expiration, Value};
pub use clock::{Clock, MockClock, SystemClock};
pub use config::{CacheConfig, DriverConfig, ServerConfig};
pub use drivers::Driver;
pub use error::{CacheError, Result};
