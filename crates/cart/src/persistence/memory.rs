//! In-process persistence backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::{PersistenceBackend, PersistenceError};

/// Persistence backend that keeps slots in memory.
///
/// Clones share the same storage, so a test can hold one handle while a
/// store owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw contents of a slot.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Write a slot directly, bypassing the cart format.
    pub fn put(&self, key: &str, data: impl Into<String>) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), data.into());
    }
}

impl PersistenceBackend for MemoryBackend {
    fn save(&self, key: &str, data: &str) -> Result<(), PersistenceError> {
        self.put(key, data);
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.get(key))
    }
}
