//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur during cache operations.
///
/// Every error is scoped to the single lookup, load, or save call that
/// produced it. The cache never retries and never substitutes default facts
/// for a file it failed to read.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// A strict-mode lookup asked for a file the snapshot does not contain.
    #[error("cache miss in strict mode: {path} is not in the snapshot")]
    CacheMiss {
        /// The path that was looked up.
        path: PathBuf,
    },

    /// The file does not exist or is not a regular file.
    #[error("cannot stat {path}: {source}")]
    Stat {
        /// The path that was looked up.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The file's content could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        /// The path that was looked up.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A snapshot could not be decompressed or parsed.
    #[error("failed to load cache snapshot: {reason}")]
    Deserialize {
        /// Description of the decode failure.
        reason: String,
    },

    /// The cache could not be serialized or compressed.
    #[error("failed to save cache snapshot: {reason}")]
    Serialize {
        /// Description of the encode failure.
        reason: String,
    },

    /// An I/O error occurred while reading or writing a snapshot file.
    #[error("snapshot I/O error at {path}: {source}")]
    Io {
        /// The snapshot path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl CacheError {
    /// Builds the error reported when a path exists but is not a regular file.
    pub(crate) fn not_a_file(path: PathBuf) -> Self {
        CacheError::Stat {
            path,
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_miss_display() {
        let err = CacheError::CacheMiss {
            path: PathBuf::from("/app/src/main.js"),
        };
        let msg = err.to_string();
        assert!(msg.contains("strict mode"));
        assert!(msg.contains("/app/src/main.js"));
    }

    #[test]
    fn stat_error_display() {
        let err = CacheError::Stat {
            path: PathBuf::from("/missing.js"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        };
        let msg = err.to_string();
        assert!(msg.contains("cannot stat"));
        assert!(msg.contains("/missing.js"));
        assert!(msg.contains("file not found"));
    }

    #[test]
    fn not_a_file_is_stat_error() {
        let err = CacheError::not_a_file(PathBuf::from("/tmp"));
        assert!(matches!(err, CacheError::Stat { .. }));
        assert!(err.to_string().contains("not a regular file"));
    }

    #[test]
    fn read_error_display() {
        let err = CacheError::Read {
            path: PathBuf::from("locked.js"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("cannot read"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn deserialize_error_display() {
        let err = CacheError::Deserialize {
            reason: "invalid gzip header".to_string(),
        };
        assert!(err.to_string().contains("invalid gzip header"));
    }

    #[test]
    fn io_error_display() {
        let err = CacheError::Io {
            path: PathBuf::from("/tmp/cache/snapshot.json.gz"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        };
        let msg = err.to_string();
        assert!(msg.contains("snapshot I/O error"));
        assert!(msg.contains("snapshot.json.gz"));
    }
}
