//! Filesystem persistence backend.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{PersistenceBackend, PersistenceError};

/// Persistence backend storing each slot as `<dir>/<key>.json`.
///
/// Writes go to a temporary file that is renamed over the slot, so a
/// crash mid-write leaves the previous contents intact. The directory is
/// created on first save.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the slot files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing a key.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` unless the key is non-empty and made only of
    /// ASCII letters, digits, `-`, `_` and `.` (and is not `.` or `..`).
    pub fn slot_path(&self, key: &str) -> Result<PathBuf, PersistenceError> {
        let valid = !key.is_empty()
            && key != "."
            && key != ".."
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(PersistenceError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> PersistenceError {
    PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl PersistenceBackend for FileBackend {
    fn save(&self, key: &str, data: &str) -> Result<(), PersistenceError> {
        let path = self.slot_path(key)?;
        fs::create_dir_all(&self.dir).map_err(|e| io_error(&self.dir, e))?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, data).map_err(|e| io_error(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| io_error(&path, e))?;

        debug!(path = %path.display(), bytes = data.len(), "Saved cart slot");
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let path = self.slot_path(key)?;
        match fs::read_to_string(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path, e)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_creates_directory() {
        let temp = TempDir::new().unwrap();
        let backend = FileBackend::new(temp.path().join("nested").join("carts"));
        backend.save("cart-storage", "{\"version\":1}").unwrap();
        assert_eq!(
            backend.load("cart-storage").unwrap().as_deref(),
            Some("{\"version\":1}")
        );
        assert!(backend.dir().join("cart-storage.json").exists());
        assert!(!backend.dir().join("cart-storage.json.tmp").exists());
    }

    #[test]
    fn test_load_missing_slot() {
        let temp = TempDir::new().unwrap();
        let backend = FileBackend::new(temp.path());
        assert!(backend.load("cart-storage").unwrap().is_none());
    }

    #[test]
    fn test_save_overwrites() {
        let temp = TempDir::new().unwrap();
        let backend = FileBackend::new(temp.path());
        backend.save("k", "one").unwrap();
        backend.save("k", "two").unwrap();
        assert_eq!(backend.load("k").unwrap().as_deref(), Some("two"));
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let backend = FileBackend::new("/tmp/unused");
        for key in ["", ".", "..", "../escape", "a/b", "with space"] {
            assert!(
                matches!(backend.slot_path(key), Err(PersistenceError::InvalidKey(_))),
                "key {key:?} should be rejected"
            );
        }
        assert!(backend.slot_path("cart-storage_v1.user").is_ok());
    }
}
