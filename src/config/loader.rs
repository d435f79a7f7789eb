//! Configuration Loader
//!
//! Environment-aware layered loading built on the `config` crate. Handles
//! file discovery, environment detection and `FANOUT_*` variable overrides.

use config::{Config, Environment, File};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::error::ConfigResult;
use super::FanoutConfig;
use crate::constants::config_sources;
use crate::logging::detect_environment;

/// Loaded, validated configuration plus where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: FanoutConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = detect_environment(|key| std::env::var(key).ok());
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        Self::build(config_dir, environment, None)
    }

    /// Load with an explicit set of `FANOUT_*` variables instead of the process environment
    pub fn load_with_overrides(
        config_dir: Option<PathBuf>,
        environment: &str,
        overrides: HashMap<String, String>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        Self::build(config_dir, environment, Some(overrides))
    }

    fn build(
        config_dir: Option<PathBuf>,
        environment: &str,
        overrides: Option<HashMap<String, String>>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            environment = %environment,
            directory = %config_directory.display(),
            "Loading configuration"
        );

        let config = Self::load_and_merge_config(&config_directory, environment, overrides)?;
        config.validate()?;

        info!(
            environment = %environment,
            service_id = %config.dispatch.service_id,
            max_concurrency = config.dispatch.max_concurrency,
            timeout_ms = config.dispatch.timeout_ms,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    fn load_and_merge_config(
        config_directory: &Path,
        environment: &str,
        overrides: Option<HashMap<String, String>>,
    ) -> ConfigResult<FanoutConfig> {
        let base_file = config_directory.join(format!("{}.toml", config_sources::FILE_STEM));
        let env_file =
            config_directory.join(format!("{}.{environment}.toml", config_sources::FILE_STEM));

        for path in [&base_file, &env_file] {
            if path.is_file() {
                debug!(file = %path.display(), "Merging configuration file");
            }
        }

        let env_source = Environment::with_prefix(config_sources::ENV_PREFIX)
            .prefix_separator("_")
            .separator(config_sources::ENV_SEPARATOR)
            .try_parsing(true)
            .source(overrides);

        let merged = Config::builder()
            .add_source(Config::try_from(&FanoutConfig::default())?)
            .add_source(File::from(base_file).required(false))
            .add_source(File::from(env_file).required(false))
            .add_source(env_source)
            .build()?;

        Ok(merged.try_deserialize()?)
    }

    fn default_config_directory() -> PathBuf {
        std::env::var(config_sources::DIRECTORY_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(config_sources::DEFAULT_DIRECTORY))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &FanoutConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }
}
