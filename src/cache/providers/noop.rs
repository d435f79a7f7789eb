//! No-op cache store
//!
//! Always misses, accepts every write. Used when caching is disabled.

use crate::cache::errors::CacheResult;
use crate::cache::traits::CacheStore;

/// Cache store that never caches anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCacheStore;

impl NoOpCacheStore {
    pub fn new() -> Self {
        Self
    }
}

impl CacheStore for NoOpCacheStore {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    async fn put(&self, _key: &str, _value: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn remove(&self, _key: &str) -> CacheResult<bool> {
        Ok(false)
    }

    fn provider_name(&self) -> &'static str {
        "noop"
    }
}
