//! Cache store trait definition

use super::errors::CacheResult;

/// Key/value store behind a [`CacheAdapter`](super::CacheAdapter)
///
/// Implementations must be safe for concurrent access; the adapter adds no
/// locking of its own. Concurrent `put`s for one key are last-write-wins.
pub trait CacheStore: Send + Sync {
    /// Returns `Ok(Some(value))` on hit, `Ok(None)` on miss.
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = CacheResult<Option<String>>> + Send;

    fn put(
        &self,
        key: &str,
        value: &str,
    ) -> impl std::future::Future<Output = CacheResult<()>> + Send;

    /// Remove a key; `Ok(true)` if it was present
    fn remove(&self, key: &str) -> impl std::future::Future<Output = CacheResult<bool>> + Send;

    /// Get the name of the cache provider
    fn provider_name(&self) -> &'static str;
}
