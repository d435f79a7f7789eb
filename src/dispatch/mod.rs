//! # Fan-Out Dispatch
//!
//! Bounded-parallel dispatch of one request to many handlers with a
//! synchronized, timeout-bounded join.
//!
//! ## Core Components
//!
//! - [`FanOutCoordinator`]: resolves targets, starts branches and assembles results
//! - Branch executor: one spawned unit per target that gates, invokes, measures
//!   and records, with cleanup guaranteed by drop guards
//! - [`RequestHandler`]: the downstream target contract
//! - [`FanOutResult`]: ordered results, or a partial result after a timeout
//! - [`MetricsSink`]: latency sample collector
//!
//! ## Usage
//!
//! ```rust
//! use fanout_core::config::DispatchConfig;
//! use fanout_core::dispatch::{FanOutCoordinator, FanOutRequest, FanOutResult};
//! use fanout_core::registry::ServiceRegistry;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example(registry: Arc<ServiceRegistry>) -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = FanOutCoordinator::new(registry, DispatchConfig::default());
//!
//! let result = coordinator
//!     .dispatch(
//!         FanOutRequest::new("lookup user 42")
//!             .targets(["directory", "billing", "audit"])
//!             .max_concurrency(2)
//!             .timeout(Duration::from_secs(1)),
//!     )
//!     .await?;
//!
//! match result {
//!     FanOutResult::Complete(results) => {
//!         for branch in results {
//!             println!("{} -> {:?}", branch.target(), branch.response());
//!         }
//!     }
//!     FanOutResult::Partial(partial) => {
//!         println!("{} of {} finished", partial.completed, partial.expected);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod branch;
pub mod coordinator;
pub mod handler;
pub mod metrics;
pub mod result;

pub use coordinator::{DispatchError, FanOutCoordinator, FanOutRequest, TargetRef};
pub use handler::{HandlerError, RequestHandler};
pub use metrics::{InFlightGauge, LatencyStatistics, LatencySummary, MetricsSink, NoOpMetricsSink};
pub use result::{AbandonedBranches, BranchFailure, BranchResult, FanOutResult, PartialFanOut};
