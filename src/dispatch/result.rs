//! # Fan-Out Results
//!
//! Per-branch results, the pre-allocated slots branches write them into, and
//! the aggregate outcome returned by the coordinator.
//!
//! Every branch owns exactly one slot, indexed by its position in the input
//! target list. The coordinator reads slots only after the completion barrier
//! has released it, so output order always equals input order no matter in
//! which order the branches finished.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};

use super::handler::HandlerError;
use crate::coordination::CompletionBarrier;
use crate::messaging::{Message, MessageError};

/// Why a branch did not produce a response
#[derive(Debug, Error)]
pub enum BranchFailure {
    /// The handler returned an error
    #[error("{0}")]
    Handler(#[from] HandlerError),

    /// The handler replied, but the reply body could not be read
    #[error("Reply could not be materialized: {0}")]
    UnreadableReply(#[from] MessageError),

    /// The handler panicked
    #[error("Handler panicked: {0}")]
    Panicked(String),

    /// The admission gate was closed before the branch obtained a permit
    #[error("Admission gate closed before the branch could start")]
    GateClosed,

    /// The branch signaled completion without recording a result
    #[error("Branch finished without recording a result")]
    Lost,
}

/// Outcome of one branch
#[derive(Debug)]
pub struct BranchResult {
    index: usize,
    target: String,
    outcome: Result<Message, BranchFailure>,
    elapsed: Duration,
}

impl BranchResult {
    pub fn success(index: usize, target: impl Into<String>, response: Message, elapsed: Duration) -> Self {
        Self {
            index,
            target: target.into(),
            outcome: Ok(response),
            elapsed,
        }
    }

    pub fn failure(
        index: usize,
        target: impl Into<String>,
        failure: BranchFailure,
        elapsed: Duration,
    ) -> Self {
        Self {
            index,
            target: target.into(),
            outcome: Err(failure),
            elapsed,
        }
    }

    /// Position of the branch in the input target list
    pub fn index(&self) -> usize {
        self.index
    }

    /// Identity of the target this branch invoked
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn response(&self) -> Option<&Message> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&BranchFailure> {
        self.outcome.as_ref().err()
    }

    /// Time spent in the downstream call (zero if the call never started)
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn into_outcome(self) -> Result<Message, BranchFailure> {
        self.outcome
    }
}

/// One write-once slot per branch
#[derive(Debug)]
pub(crate) struct ResultSlots {
    slots: Vec<Mutex<Option<BranchResult>>>,
}

impl ResultSlots {
    pub(crate) fn new(count: usize) -> Self {
        Self {
            slots: (0..count).map(|_| Mutex::new(None)).collect(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Store a branch result in its slot; a second write is rejected and logged
    pub(crate) fn fill(&self, result: BranchResult) {
        let index = result.index;
        let Some(slot) = self.slots.get(index) else {
            error!(index, slots = self.slots.len(), "Branch result index out of range");
            return;
        };

        let mut guard = slot.lock();
        if guard.is_some() {
            error!(index, "Branch result slot written twice; keeping first result");
            return;
        }
        *guard = Some(result);
    }

    /// Move a result out of its slot
    pub(crate) fn take(&self, index: usize) -> Option<BranchResult> {
        self.slots.get(index).and_then(|slot| slot.lock().take())
    }
}

/// Aggregate outcome of a fan-out
#[derive(Debug)]
pub enum FanOutResult {
    /// Every branch finished before the deadline; results are in input order
    Complete(Vec<BranchResult>),
    /// The deadline passed with branches still running
    Partial(PartialFanOut),
}

impl FanOutResult {
    pub fn is_complete(&self) -> bool {
        matches!(self, FanOutResult::Complete(_))
    }

    /// Finished branch results in input order
    pub fn results(&self) -> Vec<&BranchResult> {
        match self {
            FanOutResult::Complete(results) => results.iter().collect(),
            FanOutResult::Partial(partial) => partial.results.iter().flatten().collect(),
        }
    }

    pub fn success_count(&self) -> usize {
        self.results().iter().filter(|r| r.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.results().iter().filter(|r| !r.is_success()).count()
    }
}

/// Result of a fan-out whose deadline passed before every branch finished
///
/// Branches still running were abandoned, not cancelled: they run to
/// completion, release their own admission permits and write their own slots.
/// [`AbandonedBranches::wait`] collects those late results if the caller wants them.
#[derive(Debug)]
pub struct PartialFanOut {
    /// One entry per input target; `None` where the branch had not finished
    pub results: Vec<Option<BranchResult>>,
    pub completed: usize,
    pub expected: usize,
    pub timeout: Duration,
    pub abandoned: AbandonedBranches,
}

impl PartialFanOut {
    /// Indices of branches that had not finished at the deadline
    pub fn pending_indices(&self) -> &[usize] {
        &self.abandoned.pending
    }
}

/// Handle on branches left running after a coordination timeout
#[derive(Debug)]
pub struct AbandonedBranches {
    pending: Vec<usize>,
    slots: Arc<ResultSlots>,
    barrier: Arc<CompletionBarrier>,
}

impl AbandonedBranches {
    pub(crate) fn new(pending: Vec<usize>, slots: Arc<ResultSlots>, barrier: Arc<CompletionBarrier>) -> Self {
        Self {
            pending,
            slots,
            barrier,
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Wait up to `timeout` for the abandoned branches, returning those that finished
    pub async fn wait(self, timeout: Duration) -> Vec<BranchResult> {
        let outcome = self.barrier.await_all(timeout).await;
        if !outcome.is_complete() {
            warn!(
                pending = self.pending.len(),
                ?outcome,
                "Abandoned branches still running after extended wait"
            );
        }

        self.pending
            .iter()
            .filter_map(|&index| self.slots.take(index))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_rejects_second_write() {
        let slots = ResultSlots::new(2);
        slots.fill(BranchResult::success(1, "a", Message::text("first"), Duration::ZERO));
        slots.fill(BranchResult::success(1, "a", Message::text("second"), Duration::ZERO));

        let stored = slots.take(1).unwrap();
        assert_eq!(stored.response().and_then(Message::as_str), Some("first"));
        assert!(slots.take(1).is_none());
        assert!(slots.take(0).is_none());
        assert_eq!(slots.len(), 2);
    }

    #[test]
    fn test_out_of_range_fill_is_ignored() {
        let slots = ResultSlots::new(1);
        slots.fill(BranchResult::failure(5, "x", BranchFailure::Lost, Duration::ZERO));
        assert!(slots.take(0).is_none());
    }

    #[test]
    fn test_branch_result_exposes_exactly_one_outcome() {
        let ok = BranchResult::success(0, "svc", Message::text("done"), Duration::from_millis(3));
        assert!(ok.is_success());
        assert!(ok.error().is_none());
        assert_eq!(ok.target(), "svc");
        assert_eq!(ok.elapsed(), Duration::from_millis(3));

        let failed = BranchResult::failure(
            1,
            "svc",
            BranchFailure::Handler(HandlerError::failed("svc", "boom")),
            Duration::ZERO,
        );
        assert!(!failed.is_success());
        assert!(failed.response().is_none());
        assert_eq!(
            failed.error().map(ToString::to_string),
            Some("Handler 'svc' failed: boom".to_string())
        );
    }
}
