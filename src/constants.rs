//! # System Constants
//!
//! Defaults and fixed names shared by configuration loading and the runtime
//! components.

/// Configuration defaults
pub mod defaults {
    /// Maximum concurrent branches per fan-out; zero disables the admission gate
    pub const MAX_CONCURRENCY: usize = 0;

    /// Coordinator wait bound for a fan-out
    pub const TIMEOUT_MS: u64 = 30_000;

    pub const SERVICE_ID: &str = "fanout";

    pub const LOG_LEVEL: &str = "info";
}

/// Configuration file and environment naming
pub mod config_sources {
    /// Directory searched when none is given and `FANOUT_CONFIG_DIR` is unset
    pub const DEFAULT_DIRECTORY: &str = "config";

    pub const DIRECTORY_ENV: &str = "FANOUT_CONFIG_DIR";

    /// Base file name; `fanout.toml` and `fanout.<environment>.toml` are loaded
    pub const FILE_STEM: &str = "fanout";

    /// Prefix for `FANOUT_<SECTION>__<KEY>` overrides
    pub const ENV_PREFIX: &str = "FANOUT";

    pub const ENV_SEPARATOR: &str = "__";
}

/// Cache naming
pub mod cache {
    /// Appended to the owner name when a cache adapter has no explicit name
    pub const DEFAULT_NAME_SUFFIX: &str = "_cache";
}
