//! File-backed storage engine
//!
//! Two files per store:
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │ <name>.pocket (index)                         │
//! │   magic (4) + version (1) + bincode entries   │
//! │   entry: key, offset, len, crc32              │
//! ├───────────────────────────────────────────────┤
//! │ <name>.block (values)                         │
//! │   concatenated payloads, addressed by index   │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! A commit rewrites the block file first, syncs it, then rewrites the index
//! and syncs that. A torn commit therefore leaves an index whose checksums no
//! longer match the block data, which reopen reports as corruption instead of
//! serving garbage.
//!
//! The index file carries an exclusive advisory lock (`fs2`) for the whole
//! lifetime of the handle, so a second handle on the same store fails to open.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::ops::Bound;
use std::path::Path;

use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::error::{PocketError, Result};

use super::StorageEngine;

/// Magic bytes at the start of every index file
const INDEX_MAGIC: [u8; 4] = *b"PKDB";

/// Current index format version
const INDEX_VERSION: u8 = 1;

/// One record in the index table
#[derive(Debug, Serialize, Deserialize)]
struct IndexEntry {
    key: String,
    offset: u64,
    len: u64,
    checksum: u32,
}

/// File-backed implementation of [`StorageEngine`]
///
/// The committed tree mirrors what is on disk; staged mutations live in a
/// pending overlay (`None` = staged removal) until `commit` folds them in and
/// rewrites both files.
pub struct FileEngine {
    index_file: File,
    block_file: File,
    committed: BTreeMap<String, Vec<u8>>,
    pending: BTreeMap<String, Option<Vec<u8>>>,
}

impl FileEngine {
    /// Create a brand-new store at the given paths
    ///
    /// Fails with `StoreExists` if either backing file is already present,
    /// leaving nothing behind. On success both files exist, are locked, and
    /// hold an empty committed snapshot.
    pub fn initialize(index_path: &Path, block_path: &Path) -> Result<Self> {
        // Refuse to overwrite half a store: probe the block file before
        // creating the index file.
        if block_path.exists() {
            return Err(PocketError::StoreExists);
        }

        let index_file = match OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(index_path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(PocketError::StoreExists)
            }
            Err(e) => return Err(e.into()),
        };

        lock_index(&index_file, &store_name(index_path))?;

        let block_file = match OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(block_path)
        {
            Ok(file) => file,
            Err(e) => {
                // Do not leave a lone index file behind.
                let _ = std::fs::remove_file(index_path);
                return Err(if e.kind() == ErrorKind::AlreadyExists {
                    PocketError::StoreExists
                } else {
                    e.into()
                });
            }
        };

        let mut engine = Self {
            index_file,
            block_file,
            committed: BTreeMap::new(),
            pending: BTreeMap::new(),
        };

        // Persist the empty snapshot so both files are valid from the start.
        engine.persist()?;
        Ok(engine)
    }

    /// Open an existing store at the given paths
    ///
    /// Validates the index header and every value checksum; any structural
    /// mismatch is reported as `Corrupt`. A lock held elsewhere is reported
    /// as `StoreLocked`.
    pub fn reopen(index_path: &Path, block_path: &Path) -> Result<Self> {
        let index_file = OpenOptions::new().read(true).write(true).open(index_path)?;

        lock_index(&index_file, &store_name(index_path))?;

        let block_file = OpenOptions::new().read(true).write(true).open(block_path)?;

        let mut engine = Self {
            index_file,
            block_file,
            committed: BTreeMap::new(),
            pending: BTreeMap::new(),
        };
        engine.load()?;
        Ok(engine)
    }

    /// Read and validate both files into the committed tree
    fn load(&mut self) -> Result<()> {
        let mut index_bytes = Vec::new();
        self.index_file.seek(SeekFrom::Start(0))?;
        self.index_file.read_to_end(&mut index_bytes)?;

        if index_bytes.len() < INDEX_MAGIC.len() + 1 {
            return Err(corrupt("index file truncated"));
        }
        if index_bytes[..4] != INDEX_MAGIC {
            return Err(corrupt("bad index magic"));
        }
        if index_bytes[4] != INDEX_VERSION {
            return Err(corrupt(format!(
                "unsupported index version {}",
                index_bytes[4]
            )));
        }

        let entries: Vec<IndexEntry> = bincode::deserialize(&index_bytes[5..])
            .map_err(|e| corrupt(format!("index table unreadable: {e}")))?;

        let mut committed = BTreeMap::new();
        for entry in entries {
            self.block_file.seek(SeekFrom::Start(entry.offset))?;
            let mut value = vec![0u8; entry.len as usize];
            self.block_file
                .read_exact(&mut value)
                .map_err(|_| corrupt(format!("block data missing for key \"{}\"", entry.key)))?;

            if crc32fast::hash(&value) != entry.checksum {
                return Err(corrupt(format!(
                    "checksum mismatch for key \"{}\"",
                    entry.key
                )));
            }
            committed.insert(entry.key, value);
        }

        self.committed = committed;
        Ok(())
    }

    /// Rewrite both files from the committed tree (block first, then index)
    fn persist(&mut self) -> Result<()> {
        // Block file: concatenated payloads in key order.
        let mut entries = Vec::with_capacity(self.committed.len());
        let mut offset = 0u64;

        self.block_file.seek(SeekFrom::Start(0))?;
        self.block_file.set_len(0)?;
        for (key, value) in &self.committed {
            self.block_file.write_all(value)?;
            entries.push(IndexEntry {
                key: key.clone(),
                offset,
                len: value.len() as u64,
                checksum: crc32fast::hash(value),
            });
            offset += value.len() as u64;
        }
        self.block_file.sync_all()?;

        // Index file: header + entry table.
        let table = bincode::serialize(&entries)
            .map_err(|e| std::io::Error::new(ErrorKind::Other, e))?;

        self.index_file.seek(SeekFrom::Start(0))?;
        self.index_file.set_len(0)?;
        self.index_file.write_all(&INDEX_MAGIC)?;
        self.index_file.write_all(&[INDEX_VERSION])?;
        self.index_file.write_all(&table)?;
        self.index_file.sync_all()?;

        Ok(())
    }

    /// Whether `key` is live in the committed-plus-pending view
    fn is_live(&self, key: &str) -> bool {
        match self.pending.get(key) {
            Some(staged) => staged.is_some(),
            None => self.committed.contains_key(key),
        }
    }

    /// Smallest live key within `bound`, merging committed and pending views
    fn next_live(&self, bound: Bound<&str>) -> Option<String> {
        let mut committed = self.committed.range::<str, _>((bound, Bound::Unbounded));
        let mut pending = self.pending.range::<str, _>((bound, Bound::Unbounded));

        let mut c = committed.next();
        let mut p = pending.next();
        loop {
            match (c, p) {
                (None, None) => return None,
                (Some((ck, _)), None) => return Some(ck.clone()),
                (None, Some((pk, staged))) => {
                    if staged.is_some() {
                        return Some(pk.clone());
                    }
                    p = pending.next();
                }
                (Some((ck, _)), Some((pk, staged))) => {
                    if pk <= ck {
                        if staged.is_some() {
                            return Some(pk.clone());
                        }
                        // Staged removal hides the committed key of the same
                        // name; step past whichever iterators it covers.
                        if pk == ck {
                            c = committed.next();
                        }
                        p = pending.next();
                    } else {
                        return Some(ck.clone());
                    }
                }
            }
        }
    }
}

impl StorageEngine for FileEngine {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.pending.get(key) {
            Some(staged) => Ok(staged.clone()),
            None => Ok(self.committed.get(key).cloned()),
        }
    }

    fn set(&mut self, key: &str, value: Vec<u8>) -> Result<()> {
        self.pending.insert(key.to_string(), Some(value));
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if !self.is_live(key) {
            return Err(PocketError::KeyNotFound);
        }
        self.pending.insert(key.to_string(), None);
        Ok(())
    }

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.is_live(key))
    }

    fn first_key(&self) -> Result<Option<String>> {
        Ok(self.next_live(Bound::Unbounded))
    }

    fn next_key(&self, key: &str) -> Result<Option<String>> {
        Ok(self.next_live(Bound::Excluded(key)))
    }

    fn commit(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        for (key, staged) in std::mem::take(&mut self.pending) {
            match staged {
                Some(value) => {
                    self.committed.insert(key, value);
                }
                None => {
                    self.committed.remove(&key);
                }
            }
        }
        self.persist()
    }

    fn abort(&mut self) -> Result<()> {
        self.pending.clear();
        Ok(())
    }

    fn shutdown(self: Box<Self>) -> Result<()> {
        self.index_file.unlock()?;
        Ok(())
    }
}

impl Drop for FileEngine {
    fn drop(&mut self) {
        // Release the lock even if shutdown was never called.
        let _ = self.index_file.unlock();
    }
}

/// Display name of a store, derived from its index file path
fn store_name(index_path: &Path) -> String {
    index_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Take the exclusive advisory lock, mapping contention to `StoreLocked`
fn lock_index(index_file: &File, name: &str) -> Result<()> {
    index_file.try_lock_exclusive().map_err(|e| {
        if e.kind() == ErrorKind::WouldBlock {
            PocketError::StoreLocked {
                name: name.to_string(),
            }
        } else {
            e.into()
        }
    })
}

fn corrupt(reason: impl Into<String>) -> PocketError {
    PocketError::Corrupt {
        reason: reason.into(),
    }
}
