//! Cache error types

use thiserror::Error;

/// Errors from cache stores and adapter construction
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing store failed
    #[error("Cache backend error: {0}")]
    BackendError(String),

    /// A key derivation is mandatory for this adapter but none was configured
    #[error("Cache '{cache}' requires a key derivation but none is configured")]
    MissingKeyDerivation { cache: String },
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors raised while deriving a cache key or value
///
/// The adapter never propagates these: a failed derivation means the item is
/// neither looked up nor stored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DerivationError {
    /// The derivation expression itself is malformed
    #[error("Invalid derivation expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },

    /// The input could not be parsed in the form the derivation expects
    #[error("Derivation input is malformed: {0}")]
    MalformedInput(String),

    /// The expression did not match anything in the input
    #[error("Path '{path}' not found in derivation input")]
    PathNotFound { path: String },

    #[error("Derivation failed: {0}")]
    Failed(String),
}
