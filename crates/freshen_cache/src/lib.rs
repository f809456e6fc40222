//! Persistent, content-aware file change cache.
//!
//! This crate remembers facts about files (content hash, text/binary
//! classification, minification, dependency-directory membership, trailing
//! source map reference) and answers later lookups from a cheap metadata
//! check, re-reading a file only when its size or change time moved. The
//! whole cache persists as a gzip-compressed JSON snapshot.

#![warn(missing_docs)]

pub mod cache;
pub mod classify;
pub mod error;
pub mod facts;
pub mod fs;
pub mod key;
pub mod snapshot;

pub use cache::{CacheStats, ChangeCache};
pub use classify::TextEncoding;
pub use error::CacheError;
pub use facts::{derive_facts, FactsResult, FileFacts};
pub use fs::{AsyncFileSystem, FileStat, FileSystem, StdFileSystem, TokioFileSystem};
pub use key::normalize_key;
pub use snapshot::{CacheEntry, EntryMap};
