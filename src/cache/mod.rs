//! Cache Module
//!
//! Driver-agnostic caching with lazy TTL expiration and compute-if-absent.

mod stats;
mod store;
mod value;


// Re-export public types
pub use stats::CacheStats;
pub use store::{Cache, Expiration};
pub use value::Value;
