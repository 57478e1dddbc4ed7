//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::Value as JsonValue;

/// Request body for the SET operation (PUT /cache/:key)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The value to store, any JSON
    pub value: JsonValue,
    /// TTL in minutes; the server default applies when absent
    #[serde(default)]
    pub minutes: Option<u32>,
}

/// Validates a key taken from the request path.
///
/// Returns an error message if validation fails, None if valid.
pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > 256 {
        return Some("Key exceeds maximum length of 256 characters".to_string());
    }
    None
}
