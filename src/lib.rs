#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Fan-Out Core
//!
//! Bounded-parallel fan-out dispatch with synchronized join, a concurrent
//! service registry, and a pluggable cache adapter for message-processing
//! pipelines.
//!
//! ## Overview
//!
//! A processing step often needs to call several downstream handlers at once,
//! limit how many run simultaneously, wait for all of them (or a deadline), and
//! aggregate the outcomes. This crate provides that as one reusable utility,
//! plus the name-based service directory targets are resolved from and a cache
//! front that memoizes expensive lookups.
//!
//! ## Key Features
//!
//! - **Admission control**: a counting gate caps concurrent branches; permits are
//!   released by drop on every path
//! - **Synchronized join**: a completion barrier releases the coordinator once every
//!   branch has signaled, or at the deadline
//! - **Ordered results**: each branch writes its own pre-allocated slot, so output
//!   order equals input order
//! - **Partial failure as data**: branch errors and panics become per-branch
//!   results; a timeout is a distinct partial outcome
//! - **Abandonment, not cancellation**: branches outliving the deadline finish and
//!   clean up on their own
//! - **Cache adapter**: derived keys and values, empty-key/empty-value policy,
//!   best-effort store access
//!
//! ## Module Organization
//!
//! - [`coordination`] - admission gate and completion barrier primitives
//! - [`dispatch`] - fan-out coordinator, branch execution, results and metrics
//! - [`registry`] - concurrent name → handler directory
//! - [`cache`] - cache adapter, derivations and stores
//! - [`messaging`] - message payloads and the typed dispatch context
//! - [`config`] - layered configuration
//! - [`logging`] - structured logging bootstrap
//! - [`error`] - crate-level error roll-up
//!
//! ## Quick Start
//!
//! ```rust
//! use async_trait::async_trait;
//! use fanout_core::config::DispatchConfig;
//! use fanout_core::dispatch::{FanOutCoordinator, FanOutRequest, HandlerError, RequestHandler};
//! use fanout_core::messaging::{DispatchContext, Message};
//! use fanout_core::registry::ServiceRegistry;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct Upper;
//!
//! #[async_trait]
//! impl RequestHandler for Upper {
//!     async fn handle(&self, request: &Message, _: &DispatchContext) -> Result<Message, HandlerError> {
//!         Ok(Message::text(request.to_string().to_uppercase()))
//!     }
//!     fn name(&self) -> &str {
//!         "upper"
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let registry = Arc::new(ServiceRegistry::new());
//! registry.register("upper", Arc::new(Upper));
//!
//! let coordinator = FanOutCoordinator::new(registry, DispatchConfig::default());
//! let result = coordinator
//!     .dispatch(
//!         FanOutRequest::new("hello")
//!             .targets(["upper", "upper"])
//!             .max_concurrency(1)
//!             .timeout(Duration::from_secs(1)),
//!     )
//!     .await
//!     .unwrap();
//!
//! assert!(result.is_complete());
//! assert_eq!(result.success_count(), 2);
//! # });
//! ```

pub mod cache;
pub mod config;
pub mod constants;
pub mod coordination;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod registry;

pub use cache::{CacheAdapter, CacheStore, CachedHandler, InMemoryCacheStore, NoOpCacheStore};
pub use config::{ConfigManager, FanoutConfig};
pub use coordination::{AdmissionGate, CompletionBarrier};
pub use dispatch::{
    BranchResult, DispatchError, FanOutCoordinator, FanOutRequest, FanOutResult, HandlerError,
    RequestHandler,
};
pub use error::{FanoutError, Result};
pub use logging::init_structured_logging;
pub use messaging::{DispatchContext, Message};
pub use registry::ServiceRegistry;
