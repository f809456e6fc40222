//! Derived facts about a file's content.
//!
//! [`derive_facts`] turns the raw bytes of a file into a [`FileFacts`] record
//! and hands the decoded content back alongside it as a [`FactsResult`].
//! Only the [`FileFacts`] half is ever stored in the cache.

use freshen_common::ContentHash;
use serde::{Deserialize, Serialize};

use crate::classify::{self, detect_encoding};

/// Everything the cache remembers about a file's content.
///
/// Serialized with camelCase field names, which is the snapshot format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFacts {
    /// Digest of the decoded text (re-encoded as UTF-8) for text files, or of
    /// the raw bytes for binary files.
    pub hash: ContentHash,

    /// Whether the text looks minified.
    pub is_minified: bool,

    /// Whether the path lies under a third-party dependency directory.
    pub is_in_dependency_directory: bool,

    /// Whether the text ends with a source map reference.
    pub has_source_map_reference: bool,

    /// Whether no supported text encoding could decode the file.
    pub is_file_binary: bool,
}

/// The outcome of a cache lookup: facts plus, when the file was just read,
/// its content.
///
/// Content is `Some` after a recompute and `None` when the facts came
/// straight from the cache. The variant always agrees with
/// [`FileFacts::is_file_binary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactsResult {
    /// A file that decoded as text.
    Text {
        /// The file's facts.
        facts: FileFacts,
        /// The decoded text, if the file was read during this lookup.
        text: Option<String>,
    },
    /// A file that did not decode under any supported encoding.
    Binary {
        /// The file's facts.
        facts: FileFacts,
        /// The raw bytes, if the file was read during this lookup.
        bytes: Option<Vec<u8>>,
    },
}

impl FactsResult {
    /// Wraps stored facts without any content.
    pub fn from_facts(facts: FileFacts) -> Self {
        if facts.is_file_binary {
            FactsResult::Binary { facts, bytes: None }
        } else {
            FactsResult::Text { facts, text: None }
        }
    }

    /// Returns the facts.
    pub fn facts(&self) -> &FileFacts {
        match self {
            FactsResult::Text { facts, .. } | FactsResult::Binary { facts, .. } => facts,
        }
    }

    /// Consumes the result, returning only the facts.
    pub fn into_facts(self) -> FileFacts {
        match self {
            FactsResult::Text { facts, .. } | FactsResult::Binary { facts, .. } => facts,
        }
    }

    /// Returns the content hash.
    pub fn hash(&self) -> ContentHash {
        self.facts().hash
    }

    /// Returns `true` for binary files.
    pub fn is_binary(&self) -> bool {
        matches!(self, FactsResult::Binary { .. })
    }

    /// Returns the decoded text, if this is a text file that was just read.
    pub fn source_text(&self) -> Option<&str> {
        match self {
            FactsResult::Text { text, .. } => text.as_deref(),
            FactsResult::Binary { .. } => None,
        }
    }

    /// Returns the raw bytes, if this is a binary file that was just read.
    pub fn raw_bytes(&self) -> Option<&[u8]> {
        match self {
            FactsResult::Binary { bytes, .. } => bytes.as_deref(),
            FactsResult::Text { .. } => None,
        }
    }

    /// Returns `true` if the content was read during the lookup.
    pub fn has_content(&self) -> bool {
        match self {
            FactsResult::Text { text, .. } => text.is_some(),
            FactsResult::Binary { bytes, .. } => bytes.is_some(),
        }
    }
}

/// Computes the facts for a file from its full content.
///
/// `path` feeds only the dependency-directory check. The returned result
/// always carries the content.
pub fn derive_facts(path: &str, bytes: Vec<u8>) -> FactsResult {
    let is_in_dependency_directory = classify::is_in_dependency_directory(path);

    match detect_encoding(&bytes) {
        Some(encoding) => {
            let text = encoding.decode(&bytes);
            let facts = FileFacts {
                hash: ContentHash::from_text(&text),
                is_minified: classify::is_minified(&text),
                is_in_dependency_directory,
                has_source_map_reference: classify::has_source_map_reference(&text),
                is_file_binary: false,
            };
            FactsResult::Text {
                facts,
                text: Some(text),
            }
        }
        None => {
            let facts = FileFacts {
                hash: ContentHash::from_bytes(&bytes),
                is_minified: classify::is_minified(""),
                is_in_dependency_directory,
                has_source_map_reference: false,
                is_file_binary: true,
            };
            FactsResult::Binary {
                facts,
                bytes: Some(bytes),
            }
        }
    }
}
