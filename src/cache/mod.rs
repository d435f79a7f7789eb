//! # Cache Module
//!
//! Pluggable key/value caching for memoized lookups and transforms.
//!
//! ## Architecture
//!
//! - [`CacheStore`]: storage contract, implemented by [`InMemoryCacheStore`]
//!   (dashmap-backed, unbounded) and [`NoOpCacheStore`] (always miss)
//! - [`Derivation`]: pure `evaluate(input) -> string` used to derive keys and values
//! - [`CacheAdapter`]: key/value derivation, empty-key/empty-value policy and
//!   best-effort store access
//! - [`CachedHandler`]: a [`RequestHandler`](crate::dispatch::RequestHandler)
//!   memoized through an adapter
//!
//! ## Concurrency
//!
//! The adapter adds no locking around the store. Concurrent `put`s for the
//! same key are last-write-wins, and a `get` racing a `put` may miss. Values
//! are derived deterministically, so a lost race only costs a recomputation.

pub mod adapter;
pub mod cached_handler;
pub mod derivation;
pub mod errors;
pub mod providers;
pub mod traits;

pub use adapter::{CacheAdapter, CacheAdapterBuilder, CacheOutcome, Lookup};
pub use cached_handler::CachedHandler;
pub use derivation::{Derivation, FnDerivation, Identity, JsonPointer};
pub use errors::{CacheError, CacheResult, DerivationError};
pub use providers::{InMemoryCacheStore, NoOpCacheStore};
pub use traits::CacheStore;
