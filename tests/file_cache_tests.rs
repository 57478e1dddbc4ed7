//! Integration Tests for the File Driver
//!
//! Runs the cache against real temporary directories.

use std::fs;
use std::sync::Arc;

use mini_cache::drivers::{Driver, FileDriver};
use mini_cache::{Cache, Expiration, MockClock};
use tempfile::TempDir;

fn file_cache(dir: &TempDir, extension: Option<&str>, prefix: Option<&str>) -> (Cache, MockClock) {
    let clock = MockClock::new(1000);
    let driver = FileDriver::new(
        dir.path(),
        extension.map(str::to_string),
        prefix.map(str::to_string),
    )
    .unwrap();
    let cache = Cache::with_clock(Box::new(driver), Arc::new(clock.clone()));
    (cache, clock)
}

#[test]
fn test_file_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let (cache, _) = file_cache(&dir, None, None);

    assert!(cache.set("foo", "A basic value", 10).unwrap());

    assert_eq!(cache.created("foo"), Some(1000));
    assert_eq!(cache.expires("foo"), Some(Expiration::At(1600)));
    assert!(dir.path().join("foo").is_file());

    assert!(cache.remove("foo"));
    assert!(!dir.path().join("foo").exists());
    assert_eq!(cache.created("foo"), None);
}

#[test]
fn test_file_contents_are_the_envelope() {
    let dir = tempfile::tempdir().unwrap();
    let (cache, _) = file_cache(&dir, Some("cache"), None);

    cache.set("foo", &vec![1, 2, 3], 5).unwrap();

    let contents = fs::read_to_string(dir.path().join("foo.cache")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"created": 1000, "minutes": 5, "value": [1, 2, 3]})
    );
}

#[test]
fn test_expired_file_is_removed_on_read() {
    let dir = tempfile::tempdir().unwrap();
    let (cache, clock) = file_cache(&dir, None, None);

    cache.set("foo", "bar", 10).unwrap();
    clock.set(1600);

    assert!(dir.path().join("foo").is_file());
    assert_eq!(cache.get::<String>("foo"), None);
    assert!(!dir.path().join("foo").exists());
}

#[test]
fn test_nested_keys_and_pruning() {
    let dir = tempfile::tempdir().unwrap();
    let (cache, _) = file_cache(&dir, None, None);

    cache.set("a/b/c", &1, 0).unwrap();
    assert!(dir.path().join("a").join("b").join("c").is_file());

    assert!(cache.remove("a/b/c"));
    assert!(!dir.path().join("a").exists());
    assert!(dir.path().is_dir());
}

#[test]
fn test_keys_cannot_escape_root() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("root");
    let driver = FileDriver::new(&root, None, None).unwrap();

    let path = driver.file("../../etc/passwd");
    assert!(path.starts_with(&root));

    let cache = Cache::new(Box::new(driver));
    cache.set("../escape", "x", 0).unwrap();
    assert!(!dir.path().join("escape").exists());
    assert_eq!(cache.get::<String>("../escape"), Some("x".to_string()));
}

#[test]
fn test_malformed_file_is_a_miss() {
    let dir = tempfile::tempdir().unwrap();
    let (cache, _) = file_cache(&dir, None, None);

    fs::write(dir.path().join("foo"), "gibberish").unwrap();
    assert_eq!(cache.retrieve("foo"), None);
    assert_eq!(cache.get::<String>("foo"), None);
    assert!(cache.expired("foo"));
}

#[test]
fn test_flush_recreates_root() {
    let dir = tempfile::tempdir().unwrap();
    let (cache, _) = file_cache(&dir, None, Some("pages"));

    cache.set("a", &1, 0).unwrap();
    cache.set("b/c", &2, 0).unwrap();

    assert!(cache.flush());
    assert!(dir.path().join("pages").is_dir());
    assert_eq!(fs::read_dir(dir.path().join("pages")).unwrap().count(), 0);

    // still usable after a flush
    assert!(cache.set("d/e", &3, 0).unwrap());
    assert_eq!(cache.get::<i32>("d/e"), Some(3));
}

#[test]
fn test_existing_root_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(FileDriver::new(dir.path(), None, None).is_ok());
    assert!(FileDriver::new(dir.path(), None, None).is_ok());
}

#[test]
fn test_root_that_is_a_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "").unwrap();

    assert!(FileDriver::new(&blocker, None, None).is_err());
    assert!(Cache::file(&blocker, None, None).is_err());
}

#[test]
fn test_driver_created_reads_mtime() {
    let dir = tempfile::tempdir().unwrap();
    let (cache, clock) = file_cache(&dir, None, None);

    cache.set("foo", "bar", 0).unwrap();
    clock.set(5000);
    cache.set("foo", "baz", 0).unwrap();

    assert_eq!(cache.driver().created("foo"), Some(5000));
}

#[test]
fn test_similar_keys_do_not_collide() {
    let dir = tempfile::tempdir().unwrap();
    let (cache, _) = file_cache(&dir, None, None);

    let keys = [
        "user:1", "user_1", "a\\b", "a/b", "a//b", "../x", "__/x", "100%", "100%25",
    ];
    for (i, key) in keys.iter().enumerate() {
        assert!(cache.set(key, &i, 0).unwrap(), "store {}", key);
    }
    for (i, key) in keys.iter().enumerate() {
        assert_eq!(cache.get::<usize>(key), Some(i), "read back {}", key);
    }

    assert!(cache.remove("user:1"));
    assert_eq!(cache.get::<usize>("user_1"), Some(1));
}

#[test]
fn test_overflowing_expiry_is_a_miss() {
    let dir = tempfile::tempdir().unwrap();
    let (cache, _) = file_cache(&dir, None, None);

    let contents = format!(r#"{{"created": {}, "minutes": 10, "value": 1}}"#, i64::MAX);
    fs::write(dir.path().join("foo"), contents).unwrap();

    assert_eq!(cache.get::<i32>("foo"), None);
    assert!(cache.expired("foo"));
    assert_eq!(cache.expires("foo"), None);
}

#[test]
fn test_far_future_created_is_stored() {
    let dir = tempfile::tempdir().unwrap();
    let (cache, clock) = file_cache(&dir, None, None);

    clock.set(i64::MAX - 600);
    assert!(cache.set("foo", &1, 0).unwrap());
    assert_eq!(cache.get::<i32>("foo"), Some(1));
}

#[test]
fn test_empty_file_has_no_created() {
    let dir = tempfile::tempdir().unwrap();
    let (cache, _) = file_cache(&dir, None, None);

    fs::write(dir.path().join("foo"), "").unwrap();
    assert_eq!(cache.created("foo"), None);
    assert_eq!(cache.expires("foo"), None);
    assert!(cache.expired("foo"));
}
