//! # Fan-Out Coordinator
//!
//! Dispatches one request to an ordered list of targets concurrently and joins
//! on their completion.
//!
//! ## Flow
//!
//! 1. Validate and resolve every target up front. Zero targets or an unknown
//!    registry name fail the whole call before any branch starts.
//! 2. Start one branch per target, in input order, all sharing one
//!    [`AdmissionGate`] and one [`CompletionBarrier`].
//! 3. Wait on the barrier for at most the configured timeout.
//! 4. Read the per-branch slots in input order.
//!
//! ## Timeout Semantics
//!
//! The timeout bounds how long the *caller* waits, not how long branches run.
//! Branches still running at the deadline are abandoned: they are not
//! cancelled, they finish on their own, release their own permits and write
//! their own slots. The caller gets [`FanOutResult::Partial`] with an
//! [`AbandonedBranches`](super::result::AbandonedBranches) handle for the
//! stragglers. Latency is bounded for the caller; execution time is not.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::branch::{BranchExecutor, BranchShared};
use super::handler::RequestHandler;
use super::metrics::{InFlightGauge, LatencyStatistics, MetricsSink};
use super::result::{AbandonedBranches, BranchFailure, BranchResult, FanOutResult, PartialFanOut, ResultSlots};
use crate::config::DispatchConfig;
use crate::coordination::{AdmissionGate, BarrierOutcome, CompletionBarrier};
use crate::logging::log_dispatch_operation;
use crate::messaging::{DispatchContext, Message, MessageError};
use crate::registry::{RegistryError, ServiceRegistry};

/// Failures of a fan-out as a whole
///
/// Branch failures never appear here; they live in the per-branch results.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The request named no targets
    #[error("Fan-out requires at least one target")]
    NoTargets,

    /// A named target could not be resolved
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The request body could not be read before dispatch
    #[error("Request could not be materialized: {0}")]
    UnreadableRequest(#[from] MessageError),
}

/// A fan-out target: a registry name or a handler supplied directly
#[derive(Clone)]
pub enum TargetRef {
    Named(String),
    Direct(Arc<dyn RequestHandler>),
}

impl fmt::Debug for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetRef::Named(name) => f.debug_tuple("Named").field(name).finish(),
            TargetRef::Direct(handler) => f.debug_tuple("Direct").field(&handler.name()).finish(),
        }
    }
}

impl From<&str> for TargetRef {
    fn from(name: &str) -> Self {
        TargetRef::Named(name.to_string())
    }
}

impl From<String> for TargetRef {
    fn from(name: String) -> Self {
        TargetRef::Named(name)
    }
}

impl From<Arc<dyn RequestHandler>> for TargetRef {
    fn from(handler: Arc<dyn RequestHandler>) -> Self {
        TargetRef::Direct(handler)
    }
}

/// One fan-out invocation
///
/// Unset options fall back to the coordinator's [`DispatchConfig`].
#[derive(Debug)]
pub struct FanOutRequest {
    message: Message,
    targets: Vec<TargetRef>,
    context: Option<DispatchContext>,
    max_concurrency: Option<usize>,
    timeout: Option<Duration>,
    gate: Option<AdmissionGate>,
}

impl FanOutRequest {
    pub fn new(message: impl Into<Message>) -> Self {
        Self {
            message: message.into(),
            targets: Vec::new(),
            context: None,
            max_concurrency: None,
            timeout: None,
            gate: None,
        }
    }

    pub fn target(mut self, target: impl Into<TargetRef>) -> Self {
        self.targets.push(target.into());
        self
    }

    pub fn targets<I, T>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TargetRef>,
    {
        self.targets.extend(targets.into_iter().map(Into::into));
        self
    }

    pub fn context(mut self, context: DispatchContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Cap concurrent branches for this fan-out; 0 means unbounded
    pub fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = Some(max_concurrency);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Share an existing gate instead of creating one per fan-out
    ///
    /// Takes precedence over [`FanOutRequest::max_concurrency`].
    pub fn gate(mut self, gate: AdmissionGate) -> Self {
        self.gate = Some(gate);
        self
    }
}

/// Bounded-parallel fan-out with synchronized join
pub struct FanOutCoordinator {
    registry: Arc<ServiceRegistry>,
    config: DispatchConfig,
    metrics: Arc<dyn MetricsSink>,
    statistics: Arc<LatencyStatistics>,
    in_flight: Arc<InFlightGauge>,
}

impl fmt::Debug for FanOutCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FanOutCoordinator")
            .field("config", &self.config)
            .field("in_flight", &self.in_flight.value())
            .finish_non_exhaustive()
    }
}

impl FanOutCoordinator {
    /// Create a coordinator recording latency into its own [`LatencyStatistics`]
    pub fn new(registry: Arc<ServiceRegistry>, config: DispatchConfig) -> Self {
        let statistics = Arc::new(LatencyStatistics::new());
        Self {
            registry,
            config,
            metrics: statistics.clone(),
            statistics,
            in_flight: Arc::new(InFlightGauge::new()),
        }
    }

    /// Send latency samples to an external collector instead of the built-in statistics
    pub fn with_metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.metrics = sink;
        self
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Latency statistics; empty when an external sink is installed
    pub fn statistics(&self) -> &LatencyStatistics {
        &self.statistics
    }

    /// Branches currently executing across all fan-outs of this coordinator
    pub fn in_flight(&self) -> i64 {
        self.in_flight.value()
    }

    /// Run a fan-out
    ///
    /// Returns [`DispatchError`] only for failures detected before any branch
    /// starts. Once branches are running every outcome, including total
    /// failure and timeout, is reported through [`FanOutResult`].
    pub async fn dispatch(&self, request: FanOutRequest) -> Result<FanOutResult, DispatchError> {
        let FanOutRequest {
            mut message,
            targets,
            context,
            max_concurrency,
            timeout,
            gate,
        } = request;
        let context = context.unwrap_or_default();
        let correlation_id = context.correlation_id().to_string();

        if targets.is_empty() {
            log_dispatch_operation(&self.config.service_id, &correlation_id, 0, "rejected", Some("no targets"));
            return Err(DispatchError::NoTargets);
        }

        let resolved = targets
            .into_iter()
            .map(|target| self.resolve_target(target))
            .collect::<Result<Vec<_>, _>>()
            .inspect_err(|e| {
                log_dispatch_operation(
                    &self.config.service_id,
                    &correlation_id,
                    0,
                    "rejected",
                    Some(&e.to_string()),
                );
            })?;

        message.preserve().await?;

        let expected = resolved.len();
        let timeout = timeout.unwrap_or_else(|| self.config.timeout());
        let gate = gate.unwrap_or_else(|| {
            AdmissionGate::new(max_concurrency.unwrap_or(self.config.max_concurrency))
        });

        debug!(
            correlation_id = %correlation_id,
            targets = expected,
            capacity = ?gate.capacity(),
            timeout_ms = timeout.as_millis() as u64,
            "Starting fan-out"
        );

        let barrier = Arc::new(CompletionBarrier::new(expected));
        let slots = Arc::new(ResultSlots::new(expected));
        let shared = BranchShared {
            request: Arc::new(message),
            context: Arc::new(context),
            gate,
            metrics: Arc::clone(&self.metrics),
            in_flight: Arc::clone(&self.in_flight),
            slots: Arc::clone(&slots),
        };

        let mut target_names = Vec::with_capacity(expected);
        let started = Instant::now();
        for (index, (name, handler)) in resolved.into_iter().enumerate() {
            target_names.push(name.clone());
            BranchExecutor::new(index, name, handler, shared.clone(), barrier.signal_guard()).spawn();
        }
        drop(shared);

        let outcome = barrier.await_all(timeout).await;
        let waited_ms = started.elapsed().as_millis().to_string();

        let result = match outcome {
            BarrierOutcome::AllComplete => {
                let results = target_names
                    .into_iter()
                    .enumerate()
                    .map(|(index, target)| {
                        slots.take(index).unwrap_or_else(|| {
                            warn!(index, target = %target, "Branch signaled without a result");
                            BranchResult::failure(index, target, BranchFailure::Lost, Duration::ZERO)
                        })
                    })
                    .collect();
                let result = FanOutResult::Complete(results);
                log_dispatch_operation(
                    &self.config.service_id,
                    &correlation_id,
                    expected,
                    "complete",
                    Some(&format!(
                        "{} succeeded, {} failed in {waited_ms}ms",
                        result.success_count(),
                        result.failure_count()
                    )),
                );
                result
            }
            BarrierOutcome::TimedOut { signaled, .. } => {
                let results: Vec<Option<BranchResult>> =
                    (0..expected).map(|index| slots.take(index)).collect();
                let pending: Vec<usize> = results
                    .iter()
                    .enumerate()
                    .filter_map(|(index, slot)| slot.is_none().then_some(index))
                    .collect();
                let completed = expected - pending.len();

                warn!(
                    correlation_id = %correlation_id,
                    completed,
                    signaled,
                    expected,
                    timeout_ms = timeout.as_millis() as u64,
                    "Fan-out timed out; abandoning unfinished branches"
                );
                log_dispatch_operation(
                    &self.config.service_id,
                    &correlation_id,
                    expected,
                    "partial",
                    Some(&format!("{completed} of {expected} branches completed")),
                );

                FanOutResult::Partial(PartialFanOut {
                    results,
                    completed,
                    expected,
                    timeout,
                    abandoned: AbandonedBranches::new(pending, slots, barrier),
                })
            }
        };

        Ok(result)
    }

    fn resolve_target(&self, target: TargetRef) -> Result<(String, Arc<dyn RequestHandler>), DispatchError> {
        match target {
            TargetRef::Named(name) => {
                let handler = self.registry.resolve(&name)?;
                Ok((name, handler))
            }
            TargetRef::Direct(handler) => Ok((handler.name().to_string(), handler)),
        }
    }
}
