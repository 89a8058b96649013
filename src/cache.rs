//! In-memory cache for merged data-resource results.
//!
//! The cache lives as long as the [`Client`](crate::Client) that owns it.
//! Entries are never evicted automatically; [`ResponseCache::flush`] empties it.

use crate::metadata::QueryParams;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use std::time::SystemTime;

/// Stable key derived from a resource name and its sorted query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Hashes `(resource_name, query_params)` into a key.
    ///
    /// The parameters are hashed in sorted order, so the same parameter set
    /// always produces the same key.
    pub fn new(resource_name: &str, query_params: &QueryParams) -> Self {
        // JSON keeps names and values unambiguous (no separator collisions)
        let canonical = serde_json::json!([resource_name, query_params]).to_string();

        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored merged result.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The key the entry is stored under.
    pub key: CacheKey,
    /// The merged JSON result.
    pub merged_result: Value,
    /// When the entry was stored.
    pub created_at: SystemTime,
}

/// Thread-safe store of merged results.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl ResponseCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry stored under `key`, if any.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    /// Stores `result` under `key`, replacing any previous entry.
    pub fn put(&self, key: CacheKey, result: Value) {
        let entry = CacheEntry {
            key: key.clone(),
            merged_result: result,
            created_at: SystemTime::now(),
        };
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key, entry);
    }

    /// Returns `true` if an entry is stored under `key`.
    pub fn contains(&self, key: &CacheKey) -> bool {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.contains_key(key)
    }

    /// Removes every entry.
    pub fn flush(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    /// Returns `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
