// ABOUTME: Blob storage collaborator interface for captured thumbnails
// ABOUTME: Provides a directory-rooted backend and an in-memory backend

use crate::error::EmbedError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

/// Minimal blob store. Paths are `/`-separated relative keys such as
/// `oembed/<hash>.png`.
pub trait BlobStorage: Send + Sync {
    fn exists(&self, path: &str) -> Result<bool, EmbedError>;

    /// Stores `bytes` under `path`, replacing any existing blob, and returns
    /// the key it was saved under.
    fn save(&self, path: &str, bytes: &[u8]) -> Result<String, EmbedError>;
}

/// Stores blobs as files below a root directory.
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, EmbedError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            EmbedError::Storage(format!("Failed to create storage root {:?}: {}", root, e))
        })?;
        Ok(Self { root })
    }

    /// Storage under the platform data directory (`~/.local/share/oembed` on Linux).
    pub fn in_default_location() -> Result<Self, EmbedError> {
        let root = dirs::data_dir()
            .ok_or_else(|| EmbedError::Storage("Cannot determine data directory".to_string()))?
            .join("oembed");
        Self::new(root)
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, EmbedError> {
        let relative = Path::new(key);
        let safe = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));

        if key.is_empty() || !safe {
            return Err(EmbedError::Storage(format!("Invalid blob path '{}'", key)));
        }

        Ok(self.root.join(relative))
    }
}

impl BlobStorage for FileStorage {
    fn exists(&self, path: &str) -> Result<bool, EmbedError> {
        Ok(self.resolve(path)?.is_file())
    }

    fn save(&self, path: &str, bytes: &[u8]) -> Result<String, EmbedError> {
        let target = self.resolve(path)?;
        let parent = target
            .parent()
            .ok_or_else(|| EmbedError::Storage(format!("Invalid blob path '{}'", path)))?;
        fs::create_dir_all(parent)?;

        let mut temp = tempfile::NamedTempFile::new_in(parent)?;
        temp.write_all(bytes)?;
        temp.persist(&target)
            .map_err(|e| EmbedError::Storage(format!("Failed to save '{}': {}", path, e)))?;

        Ok(path.to_string())
    }
}

/// Keeps blobs in memory; used by tests and dry runs.
#[derive(Default)]
pub struct MemoryStorage {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs.read().get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

impl BlobStorage for MemoryStorage {
    fn exists(&self, path: &str) -> Result<bool, EmbedError> {
        Ok(self.blobs.read().contains_key(path))
    }

    fn save(&self, path: &str, bytes: &[u8]) -> Result<String, EmbedError> {
        self.blobs.write().insert(path.to_string(), bytes.to_vec());
        Ok(path.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_storage_save_and_exists() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path()).unwrap();

        assert!(!storage.exists("oembed/abc.png").unwrap());

        let key = storage.save("oembed/abc.png", b"\x89PNG").unwrap();
        assert_eq!(key, "oembed/abc.png");
        assert!(storage.exists("oembed/abc.png").unwrap());
        assert_eq!(
            fs::read(temp_dir.path().join("oembed/abc.png")).unwrap(),
            b"\x89PNG"
        );
    }

    #[test]
    fn test_file_storage_rejects_escaping_paths() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path()).unwrap();

        assert!(storage.save("../outside.png", b"x").is_err());
        assert!(storage.save("/etc/passwd", b"x").is_err());
        assert!(storage.exists("").is_err());
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();
        assert!(storage.is_empty());

        storage.save("a/b.png", b"one").unwrap();
        storage.save("a/b.png", b"two").unwrap();

        assert!(storage.exists("a/b.png").unwrap());
        assert_eq!(storage.get("a/b.png").unwrap(), b"two");
        assert_eq!(storage.len(), 1);
    }
}
