//! In-process snapshot cache with per-entry TTL.
//!
//! Entries are expired lazily: an expired entry is dropped on the read that
//! finds it, not by a background sweeper. Good enough for a cache whose
//! correctness contract is "may forget anything at any time".

use dashmap::DashMap;
use parlance_core::cache::Cache;
use parlance_types::error::CacheError;

use std::time::{Duration, Instant};

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// Sharded in-memory key-value cache implementing `Cache`.
#[derive(Default)]
pub struct InMemoryCache {
    entries: DashMap<String, CacheEntry>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries, counting not-yet-collected expired ones.
    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        // The shard guard must be released before removing the key.
        let expired = match self.entries.get(key) {
            Some(entry) => {
                if entry.expires_at > Instant::now() {
                    return Ok(Some(entry.value.clone()));
                }
                true
            }
            None => false,
        };

        if expired {
            self.entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }
}
