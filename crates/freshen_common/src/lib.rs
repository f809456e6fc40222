//! Shared foundational types used across the freshen workspace.
//!
//! Currently this is the content digest type that identifies file contents in
//! cache entries and snapshots.

#![warn(missing_docs)]

pub mod hash;

pub use hash::{ContentHash, ParseContentHashError};
