//! Session Driver
//!
//! Stores entries inside a per-session data bag. The bag is only as shared
//! as the [`Session`] handle itself: clones see the same data, separate
//! processes do not.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value as JsonValue;

use super::{normalize_prefix, Driver};
use crate::cache::Value;

/// Namespace for cache entries inside the session bag.
const SESSION_NAMESPACE: &str = "cache.";

// == Session ==
/// A key/value data bag belonging to one user session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    id: String,
    data: Arc<RwLock<HashMap<String, JsonValue>>>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: Arc::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get(&self, key: &str) -> Option<JsonValue> {
        self.data.read().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: JsonValue) {
        self.data.write().insert(key.into(), value);
    }

    pub fn remove(&self, key: &str) -> Option<JsonValue> {
        self.data.write().remove(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.data.read().keys().cloned().collect()
    }

    /// Drops every entry whose key starts with `prefix`.
    fn remove_prefixed(&self, prefix: &str) {
        self.data.write().retain(|key, _| !key.starts_with(prefix));
    }
}

// == Session Driver ==
#[derive(Debug)]
pub struct SessionDriver {
    session: Session,
    prefix: Option<String>,
}

impl SessionDriver {
    pub fn new(session: Session, prefix: Option<String>) -> Self {
        Self {
            session,
            prefix: normalize_prefix(prefix),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn session_key(&self, key: &str) -> String {
        format!("{}{}", SESSION_NAMESPACE, self.key(key))
    }
}

impl Driver for SessionDriver {
    fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    fn store(&self, key: &str, value: &Value) -> bool {
        self.session.set(self.session_key(key), value.to_array());
        true
    }

    fn retrieve(&self, key: &str) -> Option<Value> {
        self.session
            .get(&self.session_key(key))
            .and_then(|array| Value::from_array(&array))
    }

    fn remove(&self, key: &str) -> bool {
        self.session.remove(&self.session_key(key)).is_some()
    }

    fn flush(&self) -> bool {
        let namespace = match &self.prefix {
            Some(prefix) => format!("{}{}/", SESSION_NAMESPACE, prefix),
            None => SESSION_NAMESPACE.to_string(),
        };
        self.session.remove_prefixed(&namespace);
        true
    }
}
