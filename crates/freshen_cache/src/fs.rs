//! Filesystem access used by cache lookups.
//!
//! The cache only ever needs two operations from the filesystem: a metadata
//! query and a whole-file read. Both are expressed as traits so the lookup
//! algorithm can run over blocking I/O ([`FileSystem`]), non-blocking I/O
//! ([`AsyncFileSystem`]), or an in-memory double in tests.

use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

/// The subset of file metadata the cache compares against stored entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    /// File size in bytes.
    pub size: u64,
    /// Milliseconds since the Unix epoch of the most recent modification or
    /// (on Unix) inode change, whichever is later.
    pub modified_ms: u64,
    /// Whether the path refers to a regular file.
    pub is_file: bool,
}

impl FileStat {
    /// Extracts the cache-relevant fields from filesystem metadata.
    pub fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        Self {
            size: metadata.len(),
            modified_ms: change_time_ms(metadata),
            is_file: metadata.is_file(),
        }
    }
}

/// Blocking filesystem access.
pub trait FileSystem {
    /// Returns metadata for `path`.
    fn stat(&self, path: &Path) -> io::Result<FileStat>;

    /// Reads the entire content of `path`.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Non-blocking filesystem access with the same contract as [`FileSystem`].
#[async_trait]
pub trait AsyncFileSystem: Send + Sync {
    /// Returns metadata for `path`.
    async fn stat(&self, path: &Path) -> io::Result<FileStat>;

    /// Reads the entire content of `path`.
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        std::fs::metadata(path).map(|m| FileStat::from_metadata(&m))
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

/// [`AsyncFileSystem`] backed by `tokio::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioFileSystem;

#[async_trait]
impl AsyncFileSystem for TokioFileSystem {
    async fn stat(&self, path: &Path) -> io::Result<FileStat> {
        tokio::fs::metadata(path)
            .await
            .map(|m| FileStat::from_metadata(&m))
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }
}

fn change_time_ms(metadata: &std::fs::Metadata) -> u64 {
    let modified = metadata.modified().map(system_time_ms).unwrap_or(0);

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        let secs = metadata.ctime().max(0) as u64;
        let nanos = metadata.ctime_nsec().max(0) as u64;
        modified.max(secs * 1_000 + nanos / 1_000_000)
    }

    #[cfg(not(unix))]
    {
        modified
    }
}

fn system_time_ms(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
