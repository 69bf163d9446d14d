//! Append-only packet log on disk.
//!
//! The log is a plain UTF-8 text file with one entry per line. It supports
//! exactly two operations:
//! - `append`: add one line at the end, creating the file if needed
//! - `read_all`: return the whole file, distinguishing a missing file
//!
//! Every call opens and closes the file, so nothing is buffered between
//! requests.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

use crate::error::StoreError;

/// Result of reading the whole log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contents {
    /// The log file has never been created
    Missing,
    /// The log file exists but holds no bytes
    Empty,
    /// Full file contents
    Text(String),
}

/// File-backed append-only log
#[derive(Debug)]
pub struct LogStore {
    /// Path of the backing file
    path: PathBuf,
}

impl LogStore {
    /// Create a store backed by `path`. The file is not touched until the
    /// first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        info!(path = %path.display(), "Initializing packet log");
        Self { path }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `entry` followed by a newline.
    ///
    /// The line is written with a single `write_all` on a file opened in
    /// append mode, so readers never observe a line without its terminator
    /// from this process.
    pub fn append(&self, entry: &str) -> Result<(), StoreError> {
        let mut line = String::with_capacity(entry.len() + 1);
        line.push_str(entry);
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::io(&self.path, e))?;

        file.write_all(line.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| StoreError::io(&self.path, e))?;

        trace!(bytes = line.len(), "Appended entry");
        Ok(())
    }

    /// Read the entire log.
    pub fn read_all(&self) -> Result<Contents, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if text.is_empty() => Ok(Contents::Empty),
            Ok(text) => {
                trace!(bytes = text.len(), "Read log");
                Ok(Contents::Text(text))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Log file not found");
                Ok(Contents::Missing)
            }
            Err(e) => Err(StoreError::io(&self.path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> LogStore {
        LogStore::new(dir.path().join("packet_log.txt"))
    }

    #[test]
    fn test_read_missing() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert_eq!(store.read_all().unwrap(), Contents::Missing);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_read_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "").unwrap();

        assert_eq!(store.read_all().unwrap(), Contents::Empty);
    }

    #[test]
    fn test_append_creates_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.append("Packet #1: first").unwrap();

        assert_eq!(
            std::fs::read_to_string(store.path()).unwrap(),
            "Packet #1: first\n"
        );
    }

    #[test]
    fn test_append_preserves_existing() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "Packet #1: old\n").unwrap();

        store.append("Packet #1: new").unwrap();
        store.append("Packet #2: newer").unwrap();

        assert_eq!(
            store.read_all().unwrap(),
            Contents::Text("Packet #1: old\nPacket #1: new\nPacket #2: newer\n".to_string())
        );
    }

    #[test]
    fn test_read_does_not_mutate() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.append("Packet #1: a").unwrap();

        let first = store.read_all().unwrap();
        let second = store.read_all().unwrap();
        assert_eq!(first, second);
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "Packet #1: a\n");
    }

    #[test]
    fn test_append_to_directory_fails() {
        let dir = TempDir::new().unwrap();
        let store = LogStore::new(dir.path());

        match store.append("Packet #1: nope") {
            Err(StoreError::Io { path, .. }) => assert_eq!(path, dir.path()),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_read_directory_is_error_not_missing() {
        let dir = TempDir::new().unwrap();
        let store = LogStore::new(dir.path());

        assert!(matches!(store.read_all(), Err(StoreError::Io { .. })));
    }
}
