//! # PocketDB
//!
//! A lightweight embedded key-value store: a named, file-backed "pocket"
//! mapping string keys to arbitrary structured values, with:
//! - Durable commits after every mutation
//! - JSON value encoding that preserves shared/cyclic references
//! - Exclusive advisory locking per open store
//! - Session-free store discovery and deletion
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Pocket Session                           │
//! │        (open/reopen/set/get/delete/has/list/close)           │
//! └───────────────┬──────────────────────────┬──────────────────┘
//!                 │                          │
//!                 ▼                          ▼
//!         ┌─────────────┐            ┌─────────────┐
//!         │ Value Codec │            │   Engine    │
//!         │   (JSON)    │            │  (2 files)  │
//!         └─────────────┘            └──────┬──────┘
//!                                           │
//!                                    ┌──────▼──────┐
//!                                    │ name.pocket │
//!                                    │ name.block  │
//!                                    └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod engine;
pub mod registry;
pub mod session;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use codec::Value;
pub use config::Config;
pub use error::{PocketError, Result};
pub use registry::{delete_store, list_stores, RemovedFiles};
pub use session::Pocket;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of PocketDB
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
