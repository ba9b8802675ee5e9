// ABOUTME: Bounded in-process LRU cache with per-entry expiry
// ABOUTME: Backs the fetcher in tests and single-process deployments

use super::Cache;
use crate::constants::cache::MEMORY_CAPACITY;
use crate::error::EmbedError;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CachedEntry {
    data: Vec<u8>,
    /// `None` when the ttl reaches past what `Instant` can represent
    expires_at: Option<Instant>,
}

impl CachedEntry {
    fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| Instant::now() >= expires_at)
    }
}

/// LRU cache keyed by string, evicting the least recently used entry once
/// `capacity` is reached.
pub struct MemoryCache {
    entries: Mutex<LruCache<String, CachedEntry>>,
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(MEMORY_CAPACITY)
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if !entry.is_expired() => Some(entry.data.clone()),
            Some(_) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), EmbedError> {
        let entry = CachedEntry {
            data: value.to_vec(),
            expires_at: Instant::now().checked_add(ttl),
        };
        self.entries.lock().put(key.to_string(), entry);
        Ok(())
    }
}
