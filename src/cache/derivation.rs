//! # Cache Derivations
//!
//! Pure functions turning a request into a cache key, or a response into the
//! value to cache. The adapter treats them as opaque `evaluate(input) -> string`
//! capabilities.

use std::fmt;

use super::errors::DerivationError;

/// A pure, deterministic string transform
///
/// Implementations must not have side effects: the same input always yields
/// the same output.
pub trait Derivation: Send + Sync {
    fn evaluate(&self, input: &str) -> Result<String, DerivationError>;
}

/// Uses the input unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Derivation for Identity {
    fn evaluate(&self, input: &str) -> Result<String, DerivationError> {
        Ok(input.to_string())
    }
}

/// Extracts one element of a JSON document by RFC 6901 pointer
///
/// String elements are returned unquoted, `null` becomes the empty string and
/// any other element is returned as compact JSON text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPointer {
    pointer: String,
}

impl JsonPointer {
    pub fn new(pointer: impl Into<String>) -> Result<Self, DerivationError> {
        let pointer = pointer.into();
        if !pointer.is_empty() && !pointer.starts_with('/') {
            return Err(DerivationError::InvalidExpression {
                expression: pointer,
                reason: "a JSON pointer must be empty or start with '/'".to_string(),
            });
        }
        Ok(Self { pointer })
    }

    pub fn pointer(&self) -> &str {
        &self.pointer
    }
}

impl Derivation for JsonPointer {
    fn evaluate(&self, input: &str) -> Result<String, DerivationError> {
        let document: serde_json::Value = serde_json::from_str(input)
            .map_err(|e| DerivationError::MalformedInput(e.to_string()))?;

        match document.pointer(&self.pointer) {
            Some(serde_json::Value::String(s)) => Ok(s.clone()),
            Some(serde_json::Value::Null) => Ok(String::new()),
            Some(other) => Ok(other.to_string()),
            None => Err(DerivationError::PathNotFound {
                path: self.pointer.clone(),
            }),
        }
    }
}

/// Wraps a closure as a derivation
pub struct FnDerivation<F> {
    f: F,
}

impl<F> FnDerivation<F>
where
    F: Fn(&str) -> Result<String, DerivationError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for FnDerivation<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnDerivation")
    }
}

impl<F> Derivation for FnDerivation<F>
where
    F: Fn(&str) -> Result<String, DerivationError> + Send + Sync,
{
    fn evaluate(&self, input: &str) -> Result<String, DerivationError> {
        (self.f)(input)
    }
}
