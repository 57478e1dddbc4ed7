//! Cache Value Module
//!
//! Defines the envelope every driver persists: the payload plus its
//! creation timestamp and TTL. The serialized form is
//! `{"created": <i64>, "minutes": <u32>, "value": <any>}`.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::clock::{Clock, SystemClock};

// == Cache Value ==
/// A single cached entry. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    /// Creation timestamp (unix seconds)
    created: i64,
    /// TTL in minutes, 0 = never expires
    minutes: u32,
    /// The stored payload
    value: JsonValue,
}

impl Value {
    // == Constructors ==
    /// Creates a new envelope stamped with the current wall-clock time.
    pub fn new(value: JsonValue, minutes: u32) -> Self {
        Self::with_created(value, minutes, SystemClock.now())
    }

    /// Creates a new envelope with an explicit creation timestamp.
    pub fn with_created(value: JsonValue, minutes: u32, created: i64) -> Self {
        Self {
            created,
            minutes,
            value,
        }
    }

    // == Accessors ==
    pub fn created(&self) -> i64 {
        self.created
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    pub fn value(&self) -> &JsonValue {
        &self.value
    }

    pub fn into_value(self) -> JsonValue {
        self.value
    }

    // == Expires ==
    /// Returns the expiration timestamp, or None if the value never expires.
    ///
    /// The timestamp is computed even when it lies in the past; callers
    /// decide whether it is stale. It saturates at `i64::MAX`.
    pub fn expires(&self) -> Option<i64> {
        if self.minutes == 0 {
            None
        } else {
            Some(self.created.saturating_add(i64::from(self.minutes) * 60))
        }
    }

    // == Array Form ==
    /// Converts the envelope to its object form.
    pub fn to_array(&self) -> JsonValue {
        serde_json::json!({
            "created": self.created,
            "minutes": self.minutes,
            "value": self.value,
        })
    }

    /// Parses the object form. Anything malformed yields None, including
    /// an expiry that does not fit in an `i64`.
    pub fn from_array(array: &JsonValue) -> Option<Self> {
        if !array.is_object() {
            return None;
        }
        let value = Self::deserialize(array).ok()?;
        if value.minutes > 0
            && value
                .created
                .checked_add(i64::from(value.minutes) * 60)
                .is_none()
        {
            return None;
        }
        Some(value)
    }

    // == JSON Form ==
    /// Serializes the envelope to a JSON string.
    pub fn to_json(&self) -> String {
        self.to_array().to_string()
    }

    /// Parses a JSON string. Invalid JSON or missing fields yield None.
    pub fn from_json(json: &str) -> Option<Self> {
        let array: JsonValue = serde_json::from_str(json).ok()?;
        Self::from_array(&array)
    }
}
