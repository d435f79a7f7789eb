//! # Cache Adapter
//!
//! Memoizes expensive lookups and transforms behind a derived cache key.
//!
//! Per call the adapter moves through:
//!
//! ```text
//! IDLE ─→ KEY_DERIVED ─┬─ hit ──→ return cached value
//!                      └─ miss ─→ compute ─→ VALUE_DERIVED ─→ store or skip
//! ```
//!
//! A value is never stored without a key, and a value that derived to
//! "not cacheable" is never stored. Derivation failures and store failures
//! are logged and downgraded to miss/skip; they never fail the call.

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::derivation::Derivation;
use super::errors::{CacheError, CacheResult};
use super::traits::CacheStore;
use crate::config::CacheConfig;
use crate::constants::cache::DEFAULT_NAME_SUFFIX;
use crate::logging::log_cache_operation;
use crate::messaging::DispatchContext;

/// What [`CacheAdapter::get_or_compute`] did with the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Served from the cache; nothing was computed
    Hit,
    /// Computed and stored
    Stored,
    /// Computed but not stored (no key, or value not cacheable)
    Skipped,
}

/// Result of a memoized lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub value: String,
    pub outcome: CacheOutcome,
}

/// Keyed cache front for a [`CacheStore`]
pub struct CacheAdapter<S> {
    name: String,
    store: S,
    key_derivation: Option<Arc<dyn Derivation>>,
    value_derivation: Option<Arc<dyn Derivation>>,
    cache_empty_keys: bool,
    cache_empty_values: bool,
    key_input_session_key: Option<String>,
    value_input_session_key: Option<String>,
}

impl<S> std::fmt::Debug for CacheAdapter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheAdapter")
            .field("name", &self.name)
            .field("key_derivation", &self.key_derivation.is_some())
            .field("value_derivation", &self.value_derivation.is_some())
            .field("cache_empty_keys", &self.cache_empty_keys)
            .field("cache_empty_values", &self.cache_empty_values)
            .finish_non_exhaustive()
    }
}

impl<S: CacheStore> CacheAdapter<S> {
    /// Start building an adapter for the component named `owner`
    pub fn builder(owner: impl Into<String>, store: S) -> CacheAdapterBuilder<S> {
        CacheAdapterBuilder {
            owner: owner.into(),
            store,
            config: CacheConfig::default(),
            key_derivation: None,
            value_derivation: None,
        }
    }

    /// Lowercased adapter name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn log_prefix(&self) -> String {
        format!("cache [{}]", self.name)
    }

    /// Derive the cache key for a request
    ///
    /// Returns `None` ("no key") when derivation fails, or when the key is
    /// empty and empty keys are not cacheable.
    pub fn derive_key(&self, input: &str, context: &DispatchContext) -> Option<String> {
        let input = select_input(input, self.key_input_session_key.as_deref(), context);

        let key = match &self.key_derivation {
            Some(derivation) => match derivation.evaluate(input) {
                Ok(key) => key,
                Err(e) => {
                    error!(error = %e, "{} cannot determine cache key", self.log_prefix());
                    return None;
                }
            },
            None => input.to_string(),
        };

        if key.is_empty() {
            debug!("{} determined empty cache key", self.log_prefix());
            return self.cache_empty_keys.then(String::new);
        }
        Some(key)
    }

    /// Derive the value to cache from a computed response
    ///
    /// Returns `None` ("not cacheable") when derivation fails, or when the
    /// value is empty and empty values are not cacheable.
    pub fn derive_value(&self, output: &str, context: &DispatchContext) -> Option<String> {
        let output = select_input(output, self.value_input_session_key.as_deref(), context);

        let value = match &self.value_derivation {
            Some(derivation) => match derivation.evaluate(output) {
                Ok(value) => value,
                Err(e) => {
                    error!(
                        error = %e,
                        "{} cannot transform cache value, will not cache",
                        self.log_prefix()
                    );
                    return None;
                }
            },
            None => output.to_string(),
        };

        if value.is_empty() {
            debug!("{} determined empty cache value", self.log_prefix());
            return self.cache_empty_values.then(String::new);
        }
        Some(value)
    }

    /// Look up a key; store failures are reported as a miss
    pub async fn get(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(Some(value)) => {
                log_cache_operation(&self.name, "get", Some(key), "hit");
                Some(value)
            }
            Ok(None) => {
                log_cache_operation(&self.name, "get", Some(key), "miss");
                None
            }
            Err(e) => {
                warn!(
                    error = %e,
                    provider = self.store.provider_name(),
                    "{} get failed, treating as miss",
                    self.log_prefix()
                );
                log_cache_operation(&self.name, "get", Some(key), "error");
                None
            }
        }
    }

    /// Store a value; store failures are logged, never propagated
    pub async fn put(&self, key: &str, value: &str) {
        match self.store.put(key, value).await {
            Ok(()) => log_cache_operation(&self.name, "put", Some(key), "stored"),
            Err(e) => {
                warn!(
                    error = %e,
                    provider = self.store.provider_name(),
                    "{} put failed",
                    self.log_prefix()
                );
                log_cache_operation(&self.name, "put", Some(key), "error");
            }
        }
    }

    /// Remove a key; returns whether it was present
    pub async fn remove(&self, key: &str) -> bool {
        match self.store.remove(key).await {
            Ok(removed) => {
                log_cache_operation(
                    &self.name,
                    "remove",
                    Some(key),
                    if removed { "removed" } else { "absent" },
                );
                removed
            }
            Err(e) => {
                warn!(
                    error = %e,
                    provider = self.store.provider_name(),
                    "{} remove failed",
                    self.log_prefix()
                );
                log_cache_operation(&self.name, "remove", Some(key), "error");
                false
            }
        }
    }

    /// Serve `input` from the cache, or compute it and cache the derived value
    ///
    /// On a hit the cached value is returned and `compute` is not called. On a
    /// miss the computed output is returned unchanged; what gets stored is its
    /// derived value. Errors from `compute` are returned as-is and nothing is
    /// stored.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        input: &str,
        context: &DispatchContext,
        compute: F,
    ) -> Result<Lookup, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        let key = self.derive_key(input, context);

        if let Some(key) = key.as_deref() {
            if let Some(value) = self.get(key).await {
                return Ok(Lookup {
                    value,
                    outcome: CacheOutcome::Hit,
                });
            }
        }

        let output = compute().await?;

        let outcome = match (key, self.derive_value(&output, context)) {
            (Some(key), Some(value)) => {
                self.put(&key, &value).await;
                CacheOutcome::Stored
            }
            (None, _) => {
                log_cache_operation(&self.name, "store", None, "skipped_no_key");
                CacheOutcome::Skipped
            }
            (Some(key), None) => {
                log_cache_operation(&self.name, "store", Some(&key), "skipped_not_cacheable");
                CacheOutcome::Skipped
            }
        };

        Ok(Lookup {
            value: output,
            outcome,
        })
    }
}

/// Session-sourced inputs read a named context value; absent reads as empty
fn select_input<'a>(
    input: &'a str,
    session_key: Option<&str>,
    context: &'a DispatchContext,
) -> &'a str {
    match session_key {
        Some(name) => context.value(name).unwrap_or_default(),
        None => input,
    }
}

/// Builder for [`CacheAdapter`]
pub struct CacheAdapterBuilder<S> {
    owner: String,
    store: S,
    config: CacheConfig,
    key_derivation: Option<Arc<dyn Derivation>>,
    value_derivation: Option<Arc<dyn Derivation>>,
}

impl<S: CacheStore> CacheAdapterBuilder<S> {
    /// Apply every policy setting from configuration
    pub fn with_config(mut self, config: &CacheConfig) -> Self {
        self.config = config.clone();
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = Some(name.into());
        self
    }

    pub fn key_derivation(mut self, derivation: impl Derivation + 'static) -> Self {
        self.key_derivation = Some(Arc::new(derivation));
        self
    }

    pub fn value_derivation(mut self, derivation: impl Derivation + 'static) -> Self {
        self.value_derivation = Some(Arc::new(derivation));
        self
    }

    pub fn cache_empty_keys(mut self, enabled: bool) -> Self {
        self.config.cache_empty_keys = enabled;
        self
    }

    pub fn cache_empty_values(mut self, enabled: bool) -> Self {
        self.config.cache_empty_values = enabled;
        self
    }

    pub fn key_input_session_key(mut self, name: impl Into<String>) -> Self {
        self.config.key_input_session_key = Some(name.into());
        self
    }

    pub fn value_input_session_key(mut self, name: impl Into<String>) -> Self {
        self.config.value_input_session_key = Some(name.into());
        self
    }

    pub fn require_key(mut self, required: bool) -> Self {
        self.config.require_key = required;
        self
    }

    /// Validate and build
    ///
    /// Fails with [`CacheError::MissingKeyDerivation`] when a key derivation is
    /// required but not configured.
    pub fn build(self) -> CacheResult<CacheAdapter<S>> {
        let name = self
            .config
            .name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("{}{DEFAULT_NAME_SUFFIX}", self.owner))
            .to_lowercase();

        if self.config.require_key && self.key_derivation.is_none() {
            return Err(CacheError::MissingKeyDerivation { cache: name });
        }

        debug!(
            cache = %name,
            provider = self.store.provider_name(),
            cache_empty_keys = self.config.cache_empty_keys,
            cache_empty_values = self.config.cache_empty_values,
            "Cache adapter configured"
        );

        Ok(CacheAdapter {
            name,
            store: self.store,
            key_derivation: self.key_derivation,
            value_derivation: self.value_derivation,
            cache_empty_keys: self.config.cache_empty_keys,
            cache_empty_values: self.config.cache_empty_values,
            key_input_session_key: self.config.key_input_session_key,
            value_input_session_key: self.config.value_input_session_key,
        })
    }
}
