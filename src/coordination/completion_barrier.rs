//! # Completion Barrier
//!
//! Counting synchronization point that releases a waiter once N expected
//! signals have arrived, or once a deadline passes.
//!
//! Branches signal through a [`SignalGuard`], which signals exactly once when
//! it is dropped. Holding the guard for the lifetime of a branch makes the
//! signal part of the branch's cleanup: it fires on normal return, on early
//! return, and while unwinding from a panic.
//!
//! Signals beyond the expected count are a programming error. They are logged,
//! counted separately and otherwise ignored, so the completion count never
//! exceeds N.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, error};

/// Result of waiting on a [`CompletionBarrier`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierOutcome {
    /// Every expected signal arrived before the deadline
    AllComplete,
    /// The deadline passed first
    TimedOut { signaled: usize, expected: usize },
}

impl BarrierOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, BarrierOutcome::AllComplete)
    }
}

/// Barrier expecting a fixed number of completion signals
#[derive(Debug)]
pub struct CompletionBarrier {
    expected: usize,
    signaled: AtomicUsize,
    overflow: AtomicUsize,
    notify: Notify,
}

impl CompletionBarrier {
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            signaled: AtomicUsize::new(0),
            overflow: AtomicUsize::new(0),
            notify: Notify::new(),
        }
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Signals received so far (never more than `expected`)
    pub fn signaled(&self) -> usize {
        self.signaled.load(Ordering::Acquire)
    }

    /// Signals rejected because the barrier was already complete
    pub fn overflow_signals(&self) -> usize {
        self.overflow.load(Ordering::Acquire)
    }

    pub fn is_complete(&self) -> bool {
        self.signaled() >= self.expected
    }

    /// Record one completion
    ///
    /// Returns `false` when the barrier had already received every expected
    /// signal; the extra signal is dropped.
    pub fn signal(&self) -> bool {
        let expected = self.expected;
        let update = self
            .signaled
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                (count < expected).then_some(count + 1)
            });

        match update {
            Ok(previous) => {
                let now = previous + 1;
                debug!(signaled = now, expected, "Completion barrier signaled");
                if now == expected {
                    self.notify.notify_waiters();
                }
                true
            }
            Err(_) => {
                let extra = self.overflow.fetch_add(1, Ordering::AcqRel) + 1;
                error!(
                    expected,
                    extra_signals = extra,
                    "Completion barrier signaled more times than expected; ignoring signal"
                );
                false
            }
        }
    }

    /// Create a guard that signals this barrier once when dropped
    pub fn signal_guard(self: &Arc<Self>) -> SignalGuard {
        SignalGuard {
            barrier: Arc::clone(self),
        }
    }

    /// Wait until every expected signal has arrived or `timeout` elapses
    ///
    /// A barrier expecting zero signals completes immediately.
    pub async fn await_all(&self, timeout: Duration) -> BarrierOutcome {
        let deadline = Instant::now() + timeout;

        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register interest before checking the count so a signal landing
            // between the check and the wait is not missed.
            notified.as_mut().enable();

            if self.is_complete() {
                return BarrierOutcome::AllComplete;
            }

            tokio::select! {
                biased;
                _ = &mut notified => continue,
                _ = tokio::time::sleep_until(deadline) => {
                    return BarrierOutcome::TimedOut {
                        signaled: self.signaled(),
                        expected: self.expected,
                    };
                }
            }
        }
    }
}

/// Signals its barrier exactly once, on drop
#[derive(Debug)]
pub struct SignalGuard {
    barrier: Arc<CompletionBarrier>,
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        self.barrier.signal();
    }
}
