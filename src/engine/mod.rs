//! Storage Engine
//!
//! The ordered byte-oriented store underneath a pocket session.
//!
//! ## Responsibilities
//! - Map string keys to opaque byte payloads, in key order
//! - Stage mutations until `commit`, discard them on `abort`
//! - Persist to exactly two sibling files per store (index + block)
//! - Hold an exclusive advisory lock for the handle's lifetime
//!
//! The session layer only ever talks to the [`StorageEngine`] trait; the
//! bundled [`FileEngine`] is one implementation of it.

mod file;

pub use file::FileEngine;

use std::path::{Path, PathBuf};

use crate::error::Result;

/// File extension of the index file (`<name>.pocket`)
pub const INDEX_EXT: &str = "pocket";

/// File extension of the block file (`<name>.block`)
pub const BLOCK_EXT: &str = "block";

/// Compute the two backing file paths for a store identity
///
/// Returns `(index_path, block_path)`.
pub fn store_paths(name: &str, location: &Path) -> (PathBuf, PathBuf) {
    let index = location.join(format!("{name}.{INDEX_EXT}"));
    let block = location.join(format!("{name}.{BLOCK_EXT}"));
    (index, block)
}

/// Contract of the ordered byte store
///
/// Mutations (`set`/`remove`) are staged and become durable only on `commit`;
/// `abort` drops everything staged since the last commit. `first_key` and
/// `next_key` walk the live view (committed plus staged) in key order.
pub trait StorageEngine {
    /// Look up the payload stored under `key`
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stage a write of `value` under `key` (last write wins)
    fn set(&mut self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Stage removal of `key`; `KeyNotFound` if it is not live
    fn remove(&mut self, key: &str) -> Result<()>;

    /// Whether `key` is live
    fn contains(&self, key: &str) -> Result<bool>;

    /// Smallest live key, if any
    fn first_key(&self) -> Result<Option<String>>;

    /// Smallest live key strictly greater than `key`, if any
    fn next_key(&self, key: &str) -> Result<Option<String>>;

    /// Make all staged mutations durable on disk
    fn commit(&mut self) -> Result<()>;

    /// Discard all staged mutations
    fn abort(&mut self) -> Result<()>;

    /// Release the file lock and close the handle
    fn shutdown(self: Box<Self>) -> Result<()>;
}
