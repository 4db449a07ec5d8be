//! The process cache (§3): an unordered `String -> Vec<u8>` map that must
//! never block on writes and must be safe for concurrent single-key
//! access from the `CacheService`, inbound stash, and outbound fetch.
//!
//! Per Non-goals, persistence is explicitly out of scope — the cache is
//! the only persistence PALM has, and an in-memory implementation losing
//! its contents on restart is conformant, not a bug.

use std::sync::Arc;

use dashmap::DashMap;

use crate::domain_types::CacheKey;

/// A pluggable key-value store. The core only ever invokes `set`/`get`/
/// `delete`; the concrete backing engine is out of scope per spec §1.
pub trait Cache: Send + Sync + 'static {
    /// Stores `value` under `key`, overwriting any prior value.
    fn set(&self, key: CacheKey, value: Vec<u8>);

    /// Fetches the value stored under `key`, if any.
    fn get(&self, key: &CacheKey) -> Option<Vec<u8>>;

    /// Removes any value stored under `key`. Deleting an absent key is a
    /// no-op, not an error.
    fn delete(&self, key: &CacheKey);
}

/// The default in-process cache, backed by the same concurrent map the
/// teacher reaches for in its registry/conversation implementations.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: DashMap<String, Vec<u8>>,
}

impl InMemoryCache {
    /// Builds an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Wraps this cache in the `Arc` every component and service shares it
    /// by reference through (§3 "the broker and services share the
    /// process cache by reference").
    #[must_use]
    pub fn shared() -> Arc<dyn Cache> {
        Arc::new(Self::new())
    }

    /// Current number of stored entries, used by tests asserting stash
    /// cleanup (invariant: every stashed key is eventually deleted).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache currently holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Cache for InMemoryCache {
    fn set(&self, key: CacheKey, value: Vec<u8>) {
        self.entries.insert(key.into_inner(), value);
    }

    fn get(&self, key: &CacheKey) -> Option<Vec<u8>> {
        self.entries.get(key.as_ref()).map(|entry| entry.clone())
    }

    fn delete(&self, key: &CacheKey) {
        self.entries.remove(key.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let cache = InMemoryCache::new();
        let key = CacheKey::try_new("k".to_string()).unwrap();
        cache.set(key.clone(), b"v".to_vec());
        assert_eq!(cache.get(&key), Some(b"v".to_vec()));
    }

    #[test]
    fn get_on_absent_key_is_none() {
        let cache = InMemoryCache::new();
        let key = CacheKey::try_new("missing".to_string()).unwrap();
        assert_eq!(cache.get(&key), None);
    }

    #[test]
    fn delete_removes_entry_and_is_idempotent() {
        let cache = InMemoryCache::new();
        let key = CacheKey::try_new("k".to_string()).unwrap();
        cache.set(key.clone(), b"v".to_vec());
        cache.delete(&key);
        assert!(cache.get(&key).is_none());
        cache.delete(&key);
        assert!(cache.is_empty());
    }
}
