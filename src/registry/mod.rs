//! # Registry Infrastructure
//!
//! Process-level directory of named request handlers. Listener components
//! register their services at startup and unregister them on teardown;
//! request routers and the fan-out coordinator resolve targets by name.
//!
//! The registry is an ordinary value: create one, share it through an `Arc`,
//! and drop it when the owning component shuts down.

pub mod service_registry;

pub use service_registry::{
    RegistrationInfo, RegistrationOutcome, RegistryError, RegistryResult, ServiceRegistry,
};
