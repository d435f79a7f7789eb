//! # Crate Errors
//!
//! Roll-up of the per-module error types for callers that drive several
//! components and want one error type.

use thiserror::Error;

use crate::cache::CacheError;
use crate::config::ConfigurationError;
use crate::dispatch::DispatchError;
use crate::registry::RegistryError;

#[derive(Debug, Error)]
pub enum FanoutError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

pub type Result<T> = std::result::Result<T, FanoutError>;
