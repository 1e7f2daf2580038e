//! Value Codec
//!
//! Converts in-memory structured values to a reversible byte payload and back.
//!
//! ## Encoding
//!
//! Values are serialized as JSON text and stored as the raw UTF-8 bytes of
//! that text. Any `serde`-serializable type goes through [`encode`]; the
//! stored payload carries no type information, so the caller supplies the
//! target shape at [`decode`] time and a mismatch surfaces as a
//! [`PocketError::Codec`](crate::PocketError::Codec) error.
//!
//! Values that share sub-objects (or contain reference cycles) are expressed
//! with the [`Value`] graph type, whose encoding tags shared nodes:
//!
//! ```text
//! first occurrence:   {"$id": 0, "$value": {...}}
//! later occurrences:  {"$ref": 0}
//! ```
//!
//! Decoding restores the tags back into genuinely shared nodes, so identity
//! survives a round trip.

mod value;

pub use value::{SharedValue, Value};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Encode a value into its byte payload
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Decode a byte payload into a value of shape `T`
///
/// Fails with a codec error if the payload's structure is incompatible
/// with `T`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}
