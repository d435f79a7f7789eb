//! # Fan-Out Configuration System
//!
//! Typed configuration for the dispatch, cache and logging components, loaded
//! in layers by [`ConfigManager`]:
//!
//! 1. compiled defaults ([`FanoutConfig::default`])
//! 2. `<dir>/fanout.toml`
//! 3. `<dir>/fanout.<environment>.toml`
//! 4. `FANOUT_<SECTION>__<KEY>` environment variables
//!
//! Every section is optional in files; missing keys keep their defaults.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fanout_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//!
//! let timeout = manager.config().dispatch.timeout();
//! let cap = manager.config().dispatch.max_concurrency;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::defaults;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FanoutConfig {
    pub dispatch: DispatchConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

impl FanoutConfig {
    /// Reject values no component could run with
    pub fn validate(&self) -> ConfigResult<()> {
        self.dispatch.validate()?;
        self.cache.validate()?;
        Ok(())
    }
}

/// Fan-out coordinator settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Maximum branches running at once; 0 means unbounded
    pub max_concurrency: usize,
    /// How long the coordinator waits for all branches
    pub timeout_ms: u64,
    /// Identifier used in dispatch log records
    pub service_id: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: defaults::MAX_CONCURRENCY,
            timeout_ms: defaults::TIMEOUT_MS,
            service_id: defaults::SERVICE_ID.to_string(),
        }
    }
}

impl DispatchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "dispatch.timeout_ms",
                "0",
                "must be greater than zero",
            ));
        }
        if self.service_id.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "service_id",
                "dispatch",
            ));
        }
        Ok(())
    }
}

/// Cache adapter policy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Adapter name; defaults to `<owner>_cache`
    pub name: Option<String>,
    /// Treat an empty derived key as a valid slot
    pub cache_empty_keys: bool,
    /// Store empty derived values
    pub cache_empty_values: bool,
    /// Read key derivation input from this context value instead of the request
    pub key_input_session_key: Option<String>,
    /// Read value derivation input from this context value instead of the response
    pub value_input_session_key: Option<String>,
    /// A key derivation must be configured
    pub require_key: bool,
}

impl CacheConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(ConfigurationError::invalid_value(
                    "cache.name",
                    name.clone(),
                    "must not be blank when set",
                ));
            }
        }
        Ok(())
    }
}

/// Console log encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive; `RUST_LOG` takes precedence when set
    pub level: Option<String>,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Some(defaults::LOG_LEVEL.to_string()),
            format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = FanoutConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dispatch.max_concurrency, 0);
        assert_eq!(config.dispatch.timeout(), Duration::from_secs(30));
        assert!(!config.cache.cache_empty_keys);
        assert!(!config.cache.cache_empty_values);
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let mut config = FanoutConfig::default();
        config.dispatch.timeout_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidValue { ref field, .. }) if field == "dispatch.timeout_ms"
        ));
    }

    #[test]
    fn test_blank_service_id_is_rejected() {
        let mut config = FanoutConfig::default();
        config.dispatch.service_id = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::MissingRequiredField { .. })
        ));
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config: FanoutConfig =
            serde_json::from_str(r#"{"dispatch": {"max_concurrency": 4}}"#).unwrap();
        assert_eq!(config.dispatch.max_concurrency, 4);
        assert_eq!(config.dispatch.timeout_ms, defaults::TIMEOUT_MS);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_log_format_is_lowercase() {
        let format: LogFormat = serde_json::from_str(r#""json""#).unwrap();
        assert_eq!(format, LogFormat::Json);
    }
}
