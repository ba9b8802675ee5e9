// ABOUTME: File-based cache shared between processes on one machine
// ABOUTME: Implements key hashing, expiry headers and atomic entry replacement

use super::Cache;
use crate::error::EmbedError;
use crate::target::url_digest;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Size of the big-endian expiry timestamp prefixed to every entry.
const HEADER_LEN: usize = 8;

pub struct FileCache {
    cache_dir: PathBuf,
}

impl FileCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self, EmbedError> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir).map_err(|e| {
            EmbedError::Cache(format!(
                "Failed to create cache directory {:?}: {}",
                cache_dir, e
            ))
        })?;

        Ok(Self { cache_dir })
    }

    /// Cache under the platform cache directory (`~/.cache/oembed/fetch` on Linux).
    pub fn in_default_location() -> Result<Self, EmbedError> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| EmbedError::Cache("Cannot determine cache directory".to_string()))?
            .join("oembed")
            .join("fetch");
        Self::new(cache_dir)
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn clear(&self) -> Result<(), EmbedError> {
        if self.cache_dir.exists() {
            fs::remove_dir_all(&self.cache_dir)?;
        }
        fs::create_dir_all(&self.cache_dir)?;
        Ok(())
    }

    /// Deletes every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> Result<usize, EmbedError> {
        let now = unix_now();
        let mut removed = 0;
        let mut stack = vec![self.cache_dir.clone()];

        while let Some(dir) = stack.pop() {
            for entry in fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.is_dir() {
                    stack.push(path);
                    continue;
                }

                let expired = match fs::read(&path) {
                    Ok(bytes) => read_expiry(&bytes).is_none_or(|expiry| expiry <= now),
                    Err(_) => false,
                };
                if expired && fs::remove_file(&path).is_ok() {
                    removed += 1;
                }
            }
        }

        Ok(removed)
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let hash = url_digest(key);

        // First two hex chars as a subdirectory keeps directories small
        let (subdir, filename) = hash.split_at(2);
        self.cache_dir.join(subdir).join(filename)
    }
}

impl Cache for FileCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let path = self.entry_path(key);
        let bytes = fs::read(&path).ok()?;

        match read_expiry(&bytes) {
            Some(expiry) if expiry > unix_now() => Some(bytes[HEADER_LEN..].to_vec()),
            _ => {
                let _ = fs::remove_file(&path);
                None
            }
        }
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), EmbedError> {
        let path = self.entry_path(key);
        let parent = path
            .parent()
            .ok_or_else(|| EmbedError::Cache(format!("Invalid cache path {:?}", path)))?;
        fs::create_dir_all(parent).map_err(|e| {
            EmbedError::Cache(format!(
                "Failed to create cache subdirectory {:?}: {}",
                parent, e
            ))
        })?;

        let expiry = unix_now().saturating_add(ttl.as_secs());

        // Write next to the target, then rename over it
        let mut temp = tempfile::NamedTempFile::new_in(parent)?;
        temp.write_all(&expiry.to_be_bytes())?;
        temp.write_all(value)?;
        temp.persist(&path).map_err(|e| {
            EmbedError::Cache(format!("Failed to move cache file into {:?}: {}", path, e))
        })?;

        log::debug!("Cached {} -> {:?}", key, path);
        Ok(())
    }
}

fn read_expiry(bytes: &[u8]) -> Option<u64> {
    let header: [u8; HEADER_LEN] = bytes.get(..HEADER_LEN)?.try_into().ok()?;
    Some(u64::from_be_bytes(header))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
