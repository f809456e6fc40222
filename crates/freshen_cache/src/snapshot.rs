//! Snapshot encoding: the whole cache as gzip-compressed JSON.
//!
//! The JSON document maps each cache key to a [`CacheEntry`]:
//!
//! ```json
//! { "/src/a.js": { "timestamp": 1700000000000, "size": 42,
//!                  "facts": { "hash": "…", "isMinified": false,
//!                             "isInDependencyDirectory": false,
//!                             "hasSourceMapReference": false,
//!                             "isFileBinary": false } } }
//! ```
//!
//! Keys are written in sorted order, so equal caches encode to equal bytes.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::facts::FileFacts;

/// Stored state for a single file as of its last fact computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Change time in milliseconds since the Unix epoch.
    pub timestamp: u64,

    /// Size in bytes.
    pub size: u64,

    /// Facts derived from the content.
    pub facts: FileFacts,
}

/// The full key → entry mapping held by a cache.
pub type EntryMap = BTreeMap<String, CacheEntry>;

/// Serializes and compresses a mapping.
pub fn encode(entries: &EntryMap) -> Result<Vec<u8>, CacheError> {
    let json = serde_json::to_vec(entries).map_err(|e| CacheError::Serialize {
        reason: e.to_string(),
    })?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&json)
        .and_then(|()| encoder.finish())
        .map_err(|e| CacheError::Serialize {
            reason: format!("compression failed: {e}"),
        })
}

/// Decompresses and parses a mapping.
///
/// Fails without a partial result on any corruption.
pub fn decode(bytes: &[u8]) -> Result<EntryMap, CacheError> {
    let mut json = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut json)
        .map_err(|e| CacheError::Deserialize {
            reason: format!("decompression failed: {e}"),
        })?;

    serde_json::from_slice(&json).map_err(|e| CacheError::Deserialize {
        reason: e.to_string(),
    })
}
