//! # Branch Executor
//!
//! One concurrently scheduled downstream call within a fan-out.
//!
//! ```text
//! acquire permit ─→ invoke handler ─→ preserve reply ─→ record latency ─→ release permit
//!        │               │  (panics caught)                                    │
//!        └─ closed ──────┴──────────────→ BranchResult ─→ slot[index] ─→ signal barrier
//! ```
//!
//! Errors and panics from the handler never leave the branch; they become the
//! branch's [`BranchResult`]. The permit is released by dropping it and the
//! barrier is signaled by dropping the [`SignalGuard`], which the executor
//! holds for its whole run, so both happen exactly once on every path.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn, Instrument};

use super::handler::RequestHandler;
use super::metrics::{InFlightGauge, MetricsSink};
use super::result::{BranchFailure, BranchResult, ResultSlots};
use crate::coordination::{AdmissionGate, SignalGuard};
use crate::messaging::{DispatchContext, Message};

/// Everything a branch shares with its siblings
#[derive(Clone)]
pub(crate) struct BranchShared {
    pub request: Arc<Message>,
    pub context: Arc<DispatchContext>,
    pub gate: AdmissionGate,
    pub metrics: Arc<dyn MetricsSink>,
    pub in_flight: Arc<InFlightGauge>,
    pub slots: Arc<ResultSlots>,
}

/// A single downstream call, ready to be spawned
pub(crate) struct BranchExecutor {
    index: usize,
    target: String,
    handler: Arc<dyn RequestHandler>,
    shared: BranchShared,
    signal: SignalGuard,
}

impl BranchExecutor {
    pub(crate) fn new(
        index: usize,
        target: String,
        handler: Arc<dyn RequestHandler>,
        shared: BranchShared,
        signal: SignalGuard,
    ) -> Self {
        Self {
            index,
            target,
            handler,
            shared,
            signal,
        }
    }

    /// Start the branch as an independent task
    ///
    /// The task is detached: if the coordinator stops waiting, the branch
    /// still runs to completion and cleans up after itself.
    pub(crate) fn spawn(self) {
        let span = tracing::debug_span!(
            "fan_out_branch",
            index = self.index,
            target = %self.target,
            correlation_id = %self.shared.context.correlation_id(),
        );
        tokio::spawn(self.run().instrument(span));
    }

    async fn run(self) {
        let Self {
            index,
            target,
            handler,
            shared,
            signal,
        } = self;
        // Must outlive the slot write below.
        let _signal = signal;

        let result = execute(index, &target, handler.as_ref(), &shared).await;
        shared.slots.fill(result);
    }
}

async fn execute(
    index: usize,
    target: &str,
    handler: &dyn RequestHandler,
    shared: &BranchShared,
) -> BranchResult {
    let permit = match shared.gate.acquire().await {
        Ok(permit) => permit,
        Err(e) => {
            warn!(error = %e, "Branch could not obtain an admission permit");
            return BranchResult::failure(index, target, BranchFailure::GateClosed, Duration::ZERO);
        }
    };

    shared.in_flight.increase();
    let started = Instant::now();

    let outcome = AssertUnwindSafe(invoke(handler, &shared.request, &shared.context))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(BranchFailure::Panicked(panic_message(panic.as_ref()))));

    let elapsed = started.elapsed();
    shared.metrics.record_sample(elapsed);
    shared.in_flight.decrease();
    permit.release();

    match outcome {
        Ok(response) => {
            debug!(elapsed_ms = elapsed.as_millis() as u64, "Branch completed");
            BranchResult::success(index, target, response, elapsed)
        }
        Err(failure) => {
            warn!(
                error = %failure,
                elapsed_ms = elapsed.as_millis() as u64,
                "Branch failed"
            );
            BranchResult::failure(index, target, failure, elapsed)
        }
    }
}

async fn invoke(
    handler: &dyn RequestHandler,
    request: &Message,
    context: &DispatchContext,
) -> Result<Message, BranchFailure> {
    let mut reply = handler.handle(request, context).await?;
    // Drain streaming replies now so the transport behind them is released.
    reply.preserve().await?;
    Ok(reply)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
