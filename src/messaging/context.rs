//! # Dispatch Context
//!
//! Typed per-request context handed to every handler alongside the request
//! payload. It carries the correlation id used in logs and a fixed set of
//! named string values that downstream components (cache key and value
//! derivation in particular) are allowed to read. The context is immutable
//! once dispatch begins.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Per-request context shared read-only across all branches of a fan-out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchContext {
    correlation_id: String,
    values: BTreeMap<String, String>,
}

impl DispatchContext {
    /// Create a context for the given correlation id
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            values: BTreeMap::new(),
        }
    }

    /// Create a context with a freshly generated correlation id
    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    /// Attach a named value
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Read a named value
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Names of all attached values, in lexicographic order
    pub fn value_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self::generate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_are_readable_by_name() {
        let context = DispatchContext::new("corr-1")
            .with_value("customerId", "42")
            .with_value("channel", "web");

        assert_eq!(context.correlation_id(), "corr-1");
        assert_eq!(context.value("customerId"), Some("42"));
        assert_eq!(context.value("missing"), None);
        assert_eq!(
            context.value_names().collect::<Vec<_>>(),
            vec!["channel", "customerId"]
        );
    }

    #[test]
    fn test_generated_correlation_ids_differ() {
        let a = DispatchContext::generate();
        let b = DispatchContext::generate();
        assert_ne!(a.correlation_id(), b.correlation_id());
    }
}
