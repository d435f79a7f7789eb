//! # Messaging Module
//!
//! Payload and context types passed between the fan-out coordinator, the
//! service registry and downstream handlers.

pub mod context;
pub mod message;

pub use context::DispatchContext;
pub use message::{Message, MessageChunk, MessageError};
