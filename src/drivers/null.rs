//! Null Driver
//!
//! Disables caching without any branching at call sites: writes are
//! accepted and dropped, reads always miss.

use super::Driver;
use crate::cache::Value;

#[derive(Debug, Clone, Copy, Default)]
pub struct NullDriver;

impl NullDriver {
    pub fn new() -> Self {
        Self
    }
}

impl Driver for NullDriver {
    fn prefix(&self) -> Option<&str> {
        None
    }

    fn store(&self, _key: &str, _value: &Value) -> bool {
        true
    }

    fn retrieve(&self, _key: &str) -> Option<Value> {
        None
    }

    fn remove(&self, _key: &str) -> bool {
        true
    }

    fn flush(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_driver_discards_writes() {
        let driver = NullDriver::new();

        assert!(driver.store("foo", &Value::new(json!("bar"), 0)));
        assert_eq!(driver.retrieve("foo"), None);
        assert_eq!(driver.created("foo"), None);
    }

    #[test]
    fn test_null_driver_remove_and_flush_are_noops() {
        let driver = NullDriver::new();

        assert!(driver.remove("doesnotexist"));
        assert!(driver.remove("doesnotexist"));
        assert!(driver.flush());
        assert!(driver.enabled());
    }
}
