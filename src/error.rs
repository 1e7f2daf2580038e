//! Error types for PocketDB
//!
//! Provides a unified error type for all operations.
//!
//! The original design reported "not open" / "already open" conditions only
//! through a diagnostic stream. Here every condition is a typed variant so
//! callers can observe it; usage errors stay soft (no panic, no state change)
//! and can be told apart from hard failures with [`PocketError::is_usage`].

use thiserror::Error;

/// Result type alias using PocketError
pub type Result<T> = std::result::Result<T, PocketError>;

/// Unified error type for PocketDB operations
#[derive(Debug, Error)]
pub enum PocketError {
    // -------------------------------------------------------------------------
    // Usage Errors (soft: reported, never fatal, session state untouched)
    // -------------------------------------------------------------------------
    #[error("pocket is not open (attempted \"{op}\")")]
    NotOpen { op: &'static str },

    #[error("pocket \"{name}\" is already open")]
    AlreadyOpen { name: String },

    #[error("keys must be non-empty")]
    EmptyKey,

    // -------------------------------------------------------------------------
    // Open-Time Errors
    // -------------------------------------------------------------------------
    /// Backing files already exist; `open` absorbs this by falling back to
    /// reopening the existing store.
    #[error("store already exists")]
    StoreExists,

    #[error("store \"{name}\" is locked by another handle")]
    StoreLocked { name: String },

    #[error("failed to open store: {reason}")]
    OpenFailed { reason: String },

    // -------------------------------------------------------------------------
    // Engine Errors
    // -------------------------------------------------------------------------
    #[error("key not found")]
    KeyNotFound,

    #[error("store corrupted: {reason}")]
    Corrupt { reason: String },

    // -------------------------------------------------------------------------
    // I/O and Codec Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("value encoding error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl PocketError {
    /// True for soft usage errors: the operation was a no-op and the session
    /// is exactly as it was before the call.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            PocketError::NotOpen { .. } | PocketError::AlreadyOpen { .. } | PocketError::EmptyKey
        )
    }
}
