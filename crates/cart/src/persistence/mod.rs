//! Cart persistence: the stored format and the key-value backends it goes to.
//!
//! # Format
//!
//! ```json
//! {"version": 1, "savedAt": "2026-01-01T00:00:00Z", "lines": [{"product": {...}, "quantity": 2}]}
//! ```
//!
//! Only lines are stored. Item count and total are recomputed on decode so
//! stored aggregates can never disagree with stored lines.

mod file;
mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::{Cart, CartLine};

/// Current stored format version.
pub const FORMAT_VERSION: u32 = 1;

/// Errors from encoding, decoding or storing a cart.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Reading or writing storage failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON encoding or decoding failed.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Stored data was written by an unknown format version.
    #[error("Unsupported cart format version {0}")]
    UnsupportedVersion(u32),

    /// Stored data parsed but breaks a cart invariant.
    #[error("Malformed cart data: {0}")]
    Malformed(String),

    /// Key cannot be used as a storage slot name.
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// Key-value storage for serialized carts.
///
/// Each key is an independent slot that is overwritten on every save.
pub trait PersistenceBackend: Send + Sync {
    /// Overwrite the slot for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data cannot be written.
    fn save(&self, key: &str, data: &str) -> Result<(), PersistenceError>;

    /// Read the slot for `key`, or `None` if nothing was saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot exists but cannot be read.
    fn load(&self, key: &str) -> Result<Option<String>, PersistenceError>;
}

impl<B: PersistenceBackend + ?Sized> PersistenceBackend for Arc<B> {
    fn save(&self, key: &str, data: &str) -> Result<(), PersistenceError> {
        (**self).save(key, data)
    }

    fn load(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        (**self).load(key)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredCart {
    version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    saved_at: Option<DateTime<Utc>>,
    lines: Vec<CartLine>,
}

/// Serialize a cart's lines to the stored format.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn encode(cart: &Cart) -> Result<String, PersistenceError> {
    let stored = StoredCart {
        version: FORMAT_VERSION,
        saved_at: Some(Utc::now()),
        lines: cart.lines().to_vec(),
    };
    Ok(serde_json::to_string(&stored)?)
}

/// Parse stored data back into a cart.
///
/// Duplicate product ids are merged the same way repeated adds would be.
///
/// # Errors
///
/// Returns an error if the data is not valid JSON in the stored format, has
/// an unknown version, contains a zero-quantity or negative-price line,
/// or adds up to a total too large to represent.
pub fn decode(data: &str) -> Result<Cart, PersistenceError> {
    let stored: StoredCart = serde_json::from_str(data)?;

    if stored.version != FORMAT_VERSION {
        return Err(PersistenceError::UnsupportedVersion(stored.version));
    }

    if let Some(line) = stored.lines.iter().find(|line| line.quantity == 0) {
        return Err(PersistenceError::Malformed(format!(
            "line for product {} has zero quantity",
            line.product.id
        )));
    }

    if let Some(line) = stored
        .lines
        .iter()
        .find(|line| line.product.price.is_sign_negative())
    {
        return Err(PersistenceError::Malformed(format!(
            "line for product {} has a negative price",
            line.product.id
        )));
    }

    Cart::from_lines(stored.lines)
        .ok_or_else(|| PersistenceError::Malformed("cart total overflows".to_string()))
}
