//! In-memory cache store backed by `DashMap`
//!
//! Unbounded and process-local: entries live until removed or cleared. There
//! is no eviction or expiry.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use crate::cache::errors::CacheResult;
use crate::cache::traits::CacheStore;

/// Concurrent in-process cache store
///
/// Clones share the same entries.
#[derive(Clone, Default)]
pub struct InMemoryCacheStore {
    entries: Arc<DashMap<String, String>>,
}

impl std::fmt::Debug for InMemoryCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCacheStore")
            .field("entry_count", &self.entries.len())
            .finish()
    }
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let result = self.entries.get(key).map(|entry| entry.value().clone());

        if result.is_some() {
            debug!(key = key, "Cache HIT (memory)");
        } else {
            debug!(key = key, "Cache MISS (memory)");
        }

        Ok(result)
    }

    async fn put(&self, key: &str, value: &str) -> CacheResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> CacheResult<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_get_returns_value() {
        let store = InMemoryCacheStore::new();
        store.put("k", "v1").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v1".to_string()));

        store.put("k", "v2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v2".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_reports_presence() {
        let store = InMemoryCacheStore::new();
        store.put("k", "v").await.unwrap();
        assert!(store.remove("k").await.unwrap());
        assert!(!store.remove("k").await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let store = InMemoryCacheStore::new();
        let other = store.clone();
        store.put("", "empty-key slot").await.unwrap();
        assert_eq!(other.get("").await.unwrap(), Some("empty-key slot".to_string()));
        other.clear();
        assert!(store.is_empty());
    }
}
