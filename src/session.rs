//! Pocket Session
//!
//! The lifecycle of one named persistent store.
//!
//! ## Responsibilities
//! - Own at most one engine handle (create on open, shut down on close)
//! - Enforce "operations require an open session"
//! - Commit synchronously after every mutation
//! - Encode/decode values through the codec on the way in and out
//!
//! ## State machine
//!
//! ```text
//! Closed --open/reopen (success)--> Open --close--> Closed
//! Closed --open (failure)--> Closed   (no partial state)
//! ```
//!
//! Calling a data operation while closed is a usage error, not a panic: the
//! call returns [`PocketError::NotOpen`], logs a warning, and changes nothing.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec;
use crate::config::Config;
use crate::engine::{store_paths, FileEngine, StorageEngine};
use crate::error::{PocketError, Result};

/// A session over one named, file-backed key-value store
///
/// Values are anything `serde`-serializable; they are stored as an opaque
/// byte payload, so the caller supplies the target type again on read.
/// Every `set`/`delete` commits before returning: once a mutating call
/// returns `Ok`, the change is durable on disk.
pub struct Pocket {
    name: Option<String>,
    location: Option<PathBuf>,
    engine: Option<Box<dyn StorageEngine>>,
}

impl Pocket {
    /// Create a closed session; call [`Pocket::open`] to attach it to a store
    pub fn new() -> Self {
        Self {
            name: None,
            location: None,
            engine: None,
        }
    }

    /// Whether the session currently holds an open store
    pub fn is_open(&self) -> bool {
        self.engine.is_some()
    }

    /// Name of the store, recorded on the last successful open
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Directory of the store, recorded on the last successful open
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Open (or create) the store `name` inside `location`
    ///
    /// Tries to initialize a fresh store first; if the backing files already
    /// exist, falls back to reopening them. On success the session is open
    /// and the identity is recorded for [`Pocket::reopen`].
    ///
    /// Calling this on an already-open session is a no-op that returns
    /// `AlreadyOpen` and leaves the session untouched. A failed open (missing
    /// directory, files locked by another handle, corrupted store) leaves the
    /// session closed with no partial state.
    pub fn open(&mut self, name: &str, location: &Path) -> Result<()> {
        if self.is_open() {
            tracing::warn!(
                name,
                "trying to open an already opened pocket; existing session kept"
            );
            return Err(PocketError::AlreadyOpen {
                name: self.name.clone().unwrap_or_default(),
            });
        }

        let engine = match self.open_engine(name, location) {
            Ok(engine) => engine,
            Err(e) => {
                tracing::warn!(name, error = %e, "failed to open pocket");
                return Err(e);
            }
        };

        self.engine = Some(Box::new(engine));
        self.name = Some(name.to_string());
        self.location = Some(location.to_path_buf());
        tracing::debug!(name, location = %location.display(), "pocket opened");
        Ok(())
    }

    /// Open using a [`Config`]'s location
    pub fn open_with(&mut self, name: &str, config: &Config) -> Result<()> {
        self.open(name, &config.location)
    }

    /// Open the previously recorded store again after a [`Pocket::close`]
    pub fn reopen(&mut self) -> Result<()> {
        if self.is_open() {
            let name = self.name.clone().unwrap_or_default();
            tracing::warn!(name, "trying to reopen an already opened pocket");
            return Err(PocketError::AlreadyOpen { name });
        }

        let (name, location) = match (self.name.clone(), self.location.clone()) {
            (Some(name), Some(location)) => (name, location),
            _ => {
                return Err(PocketError::OpenFailed {
                    reason: "no store identity recorded; open a pocket first".to_string(),
                })
            }
        };
        self.open(&name, &location)
    }

    /// Close the store, releasing the file locks
    ///
    /// Aborts anything uncommitted (a safety net only: mutations commit as
    /// they happen), then shuts the engine handle down. The store identity
    /// is kept so the session can [`Pocket::reopen`] later.
    pub fn close(&mut self) -> Result<()> {
        let Some(mut engine) = self.engine.take() else {
            return Err(self.not_open("close"));
        };

        engine.abort()?;
        engine.shutdown()?;
        tracing::debug!(name = self.name.as_deref(), "pocket closed");
        Ok(())
    }

    // =========================================================================
    // Data Operations
    // =========================================================================

    /// Store `value` under `key` and commit
    ///
    /// Overwrites any previous value for the key. Encoding or I/O failures
    /// propagate; when this returns `Ok` the write is durable.
    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let Some(engine) = self.engine.as_mut() else {
            return Err(self.not_open("set"));
        };
        if key.is_empty() {
            tracing::warn!("rejecting empty key");
            return Err(PocketError::EmptyKey);
        }

        let bytes = codec::encode(value)?;
        engine.set(key, bytes)?;
        engine.commit()
    }

    /// Fetch the value stored under `key`, decoded as `T`
    ///
    /// `Ok(None)` when the key is absent. A present payload whose shape does
    /// not match `T` is a hard codec error, not `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(engine) = self.engine.as_ref() else {
            return Err(self.not_open("get"));
        };

        match engine.get(key)? {
            Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Like [`Pocket::get`], but with a caller-supplied fallback for an
    /// absent key
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Remove `key` and commit; removing an absent key is a silent no-op
    pub fn delete(&mut self, key: &str) -> Result<()> {
        let Some(engine) = self.engine.as_mut() else {
            return Err(self.not_open("delete"));
        };

        match engine.remove(key) {
            Ok(()) => engine.commit(),
            // Deletion is idempotent; nothing staged, nothing to commit.
            Err(PocketError::KeyNotFound) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Whether `key` currently has a value
    pub fn has_key(&self, key: &str) -> Result<bool> {
        let Some(engine) = self.engine.as_ref() else {
            return Err(self.not_open("has_key"));
        };
        engine.contains(key)
    }

    /// Every key in the store, in the engine's key order
    ///
    /// Full forward scan; may be slow on large stores.
    pub fn list_keys(&self) -> Result<Vec<String>> {
        let Some(engine) = self.engine.as_ref() else {
            return Err(self.not_open("list_keys"));
        };

        let mut keys = Vec::new();
        let mut cursor = engine.first_key()?;
        while let Some(key) = cursor {
            cursor = engine.next_key(&key)?;
            keys.push(key);
        }
        Ok(keys)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Initialize a fresh store, falling back to reopening an existing one
    fn open_engine(&self, name: &str, location: &Path) -> Result<FileEngine> {
        let (index_path, block_path) = store_paths(name, location);

        match FileEngine::initialize(&index_path, &block_path) {
            Ok(engine) => Ok(engine),
            Err(PocketError::StoreExists) => FileEngine::reopen(&index_path, &block_path),
            Err(e) => Err(e),
        }
    }

    fn not_open(&self, op: &'static str) -> PocketError {
        tracing::warn!(
            op,
            name = self.name.as_deref(),
            "operation on a pocket that is not open"
        );
        PocketError::NotOpen { op }
    }
}

impl Default for Pocket {
    fn default() -> Self {
        Self::new()
    }
}
