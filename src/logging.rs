//! # Structured Logging Module
//!
//! Environment-aware structured logging for fan-out dispatch, registry and
//! cache operations. Console output is human readable by default and switches
//! to JSON lines when `FANOUT_LOG_FORMAT=json` (or `logging.format = "json"`).

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{LogFormat, LoggingConfig};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging from environment variables
pub fn init_structured_logging() {
    let environment = detect_environment(|key| std::env::var(key).ok());
    let format = match std::env::var("FANOUT_LOG_FORMAT").ok().as_deref() {
        Some("json") => LogFormat::Json,
        _ => LogFormat::Pretty,
    };

    init_with_config(&LoggingConfig {
        level: Some(default_log_level(&environment).to_string()),
        format,
    });
}

/// Initialize structured logging from loaded configuration
///
/// Only the first call in a process installs a subscriber. `RUST_LOG`, when
/// set, takes precedence over the configured level.
pub fn init_with_config(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let level = config.level.clone().unwrap_or_else(|| "info".to_string());
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

        let layer = match config.format {
            LogFormat::Json => fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .json()
                .boxed(),
            LogFormat::Pretty => fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(true)
                .boxed(),
        };

        // A subscriber may already be installed by an embedding application.
        if tracing_subscriber::registry()
            .with(layer.with_filter(filter))
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            level = %level,
            format = ?config.format,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Resolve the deployment environment name
///
/// Checks `FANOUT_ENV`, then `APP_ENV`, defaulting to `development`.
pub fn detect_environment<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup("FANOUT_ENV")
        .or_else(|| lookup("APP_ENV"))
        .unwrap_or_else(|| "development".to_string())
}

/// Default log level for an environment
pub fn default_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

/// Log structured data for fan-out dispatch operations
pub fn log_dispatch_operation(
    service: &str,
    correlation_id: &str,
    targets: usize,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        service = %service,
        correlation_id = %correlation_id,
        targets = targets,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🔀 DISPATCH_OPERATION"
    );
}

/// Log structured data for service registry operations
pub fn log_registry_operation(operation: &str, service: &str, status: &str) {
    tracing::info!(
        operation = %operation,
        service = %service,
        status = %status,
        timestamp = %Utc::now().to_rfc3339(),
        "📚 REGISTRY_OPERATION"
    );
}

/// Log structured data for cache operations
pub fn log_cache_operation(cache: &str, operation: &str, key: Option<&str>, status: &str) {
    tracing::debug!(
        cache = %cache,
        operation = %operation,
        key = key,
        status = %status,
        "🗄️ CACHE_OPERATION"
    );
}
