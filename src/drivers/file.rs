//! File Driver
//!
//! Stores each entry as a JSON file below a root directory. A prefix
//! becomes a sub-directory of the root, so flushing one namespace never
//! touches another.

use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};

use tracing::{debug, info, warn};

use super::{normalize_prefix, Driver};
use crate::cache::Value;
use crate::error::Result;

// == File Driver ==
#[derive(Debug)]
pub struct FileDriver {
    /// Directory given by the caller
    base: PathBuf,
    /// Namespace directory (`base/prefix`, or `base` without prefix)
    root: PathBuf,
    /// Optional file extension, without the leading dot
    extension: Option<String>,
    prefix: Option<String>,
}

impl FileDriver {
    // == Constructor ==
    /// Creates the driver and its root directory.
    ///
    /// An already existing directory (including one created concurrently by
    /// another process) is not an error.
    pub fn new(
        root: impl Into<PathBuf>,
        extension: Option<String>,
        prefix: Option<String>,
    ) -> Result<Self> {
        let base = root.into();
        let prefix = normalize_prefix(prefix);
        let root = match &prefix {
            Some(prefix) => base.join(encode_key(prefix)),
            None => base.clone(),
        };

        fs::create_dir_all(&root)?;
        info!(root = %root.display(), "File cache initialized");

        Ok(Self {
            base,
            root,
            extension: extension.filter(|e| !e.is_empty()),
            prefix,
        })
    }

    /// Namespace directory holding this driver's files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // == File Path ==
    /// Returns the path of the file backing `key`.
    pub fn file(&self, key: &str) -> PathBuf {
        let path = self.base.join(encode_key(&self.key(key)));
        match &self.extension {
            Some(extension) => {
                let mut path = path.into_os_string();
                path.push(".");
                path.push(extension);
                PathBuf::from(path)
            }
            None => path,
        }
    }

    /// Removes empty directories between `path` and the namespace root.
    fn prune_empty_dirs(&self, path: &Path) {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir == self.root || !dir.starts_with(&self.root) {
                break;
            }
            if fs::remove_dir(dir).is_err() {
                break;
            }
            current = dir.parent();
        }
    }

    fn write(&self, path: &Path, value: &Value) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, value.to_json())?;

        // the modification time doubles as the creation timestamp
        let offset = Duration::from_secs(value.created().unsigned_abs());
        let mtime = if value.created() >= 0 {
            UNIX_EPOCH.checked_add(offset)
        } else {
            UNIX_EPOCH.checked_sub(offset)
        };
        if let Some(mtime) = mtime {
            // some filesystems reject pre-epoch or far-future times
            let file = File::options().write(true).open(path)?;
            if let Err(e) = file.set_modified(mtime) {
                debug!(path = %path.display(), error = %e, "File mtime rejected");
            }
        }
        Ok(())
    }
}

impl Driver for FileDriver {
    fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    fn store(&self, key: &str, value: &Value) -> bool {
        let path = self.file(key);
        match self.write(&path, value) {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to write cache file");
                false
            }
        }
    }

    fn retrieve(&self, key: &str) -> Option<Value> {
        let path = self.file(key);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read cache file");
                return None;
            }
        };

        let value = Value::from_json(&contents);
        if value.is_none() {
            debug!(path = %path.display(), "Ignoring malformed cache file");
        }
        value
    }

    fn remove(&self, key: &str) -> bool {
        let path = self.file(key);
        match fs::remove_file(&path) {
            Ok(()) => {
                self.prune_empty_dirs(&path);
                true
            }
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to remove cache file");
                false
            }
        }
    }

    fn flush(&self) -> bool {
        let removed = match fs::remove_dir_all(&self.root) {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => true,
            Err(e) => {
                warn!(root = %self.root.display(), error = %e, "Failed to remove cache directory");
                false
            }
        };

        // always try to recreate, so later writes find their directory
        let recreated = match fs::create_dir_all(&self.root) {
            Ok(()) => true,
            Err(e) => {
                warn!(root = %self.root.display(), error = %e, "Failed to recreate cache directory");
                false
            }
        };

        removed && recreated
    }

    /// Reads the creation time from the file's mtime without parsing it.
    ///
    /// Empty files are treated as absent. Other malformed contents are not
    /// detected here and still report their mtime, while `retrieve` misses.
    fn created(&self, key: &str) -> Option<i64> {
        let metadata = fs::metadata(self.file(key)).ok()?;
        if !metadata.is_file() || metadata.len() == 0 {
            return None;
        }

        let modified = metadata.modified().ok()?;
        match modified.duration_since(UNIX_EPOCH) {
            Ok(since) => i64::try_from(since.as_secs()).ok(),
            // pre-epoch mtime: fall back to the stored envelope
            Err(_) => self.retrieve(key).map(|value| value.created()),
        }
    }
}

// == Key Encoding ==
/// Marker for an empty key segment (`a//b`, a leading or trailing `/`).
const EMPTY_SEGMENT: &str = "%";

/// Turns a cache key into a relative path that cannot escape the root.
///
/// The key is split on `/` into directories. Within a segment every byte
/// outside `[A-Za-z0-9._,-]` becomes `%xx` (so `%`, `\` and `:` are
/// escaped too), dot-only segments are fully escaped, and empty segments
/// become a lone `%`. Distinct keys always map to distinct paths.
fn encode_key(key: &str) -> PathBuf {
    key.split('/').map(encode_segment).collect()
}

fn encode_segment(segment: &str) -> String {
    if segment.is_empty() {
        return EMPTY_SEGMENT.to_string();
    }

    let dots_only = segment.bytes().all(|b| b == b'.');
    segment
        .bytes()
        .map(|b| {
            let plain = b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-' | b',');
            if plain && !dots_only {
                (b as char).to_string()
            } else {
                format!("%{:02x}", b)
            }
        })
        .collect()
}
