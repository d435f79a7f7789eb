//! # Request Handler Traits
//!
//! Contract for downstream targets invoked by the fan-out coordinator and by
//! the service registry. A handler receives the request payload and the
//! dispatch context and returns a response or fails.
//!
//! Handlers are owned by whoever created them; the coordinator and registry
//! only hold `Arc` references for as long as they need to call them.

use async_trait::async_trait;
use thiserror::Error;

use crate::messaging::{DispatchContext, Message};

/// Failure reported by a handler
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The downstream call failed
    #[error("Handler '{handler}' failed: {message}")]
    Failed { handler: String, message: String },

    /// The downstream call exceeded its own timeout
    #[error("Handler '{handler}' timed out after {timeout_ms}ms")]
    Timeout { handler: String, timeout_ms: u64 },

    /// The downstream call returned something the handler could not interpret
    #[error("Handler '{handler}' returned a malformed response: {message}")]
    MalformedResponse { handler: String, message: String },

    /// Any other failure surfaced by handler internals
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn failed(handler: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            handler: handler.into(),
            message: message.into(),
        }
    }

    pub fn timeout(handler: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            handler: handler.into(),
            timeout_ms,
        }
    }

    pub fn malformed(handler: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            handler: handler.into(),
            message: message.into(),
        }
    }
}

/// A downstream invocable: sender, listener-backed service, or any other target
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync`: the same handler may be invoked from
/// several branches, and from registry dispatch, concurrently.
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    /// Process one request
    async fn handle(
        &self,
        request: &Message,
        context: &DispatchContext,
    ) -> Result<Message, HandlerError>;

    /// Identity used in branch results and logs
    fn name(&self) -> &str;
}
