// ABOUTME: Cache collaborator interface used by the fetcher
// ABOUTME: Exposes in-memory and file-backed implementations with per-entry TTL

mod file;
mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

use crate::error::EmbedError;
use std::time::Duration;

/// Content-addressable byte cache with per-entry expiry.
///
/// Implementations must be safe to share between threads. Entries are
/// replaced wholesale by `set`; concurrent writers for one key race and the
/// last write wins.
pub trait Cache: Send + Sync {
    /// Returns the entry if it exists and has not expired.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), EmbedError>;
}

/// A cache that never stores anything. Every `get` is a miss.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl Cache for NoCache {
    fn get(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }

    fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<(), EmbedError> {
        Ok(())
    }
}
