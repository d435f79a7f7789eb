//! # Admission Gate
//!
//! Counting-permit limiter bounding how many branch executions run at once.
//!
//! The gate wraps a `tokio::sync::Semaphore`. A permit is only ever handed out
//! as an [`AdmissionPermit`] value, and the permit goes back to the gate when
//! that value is dropped. Release therefore happens on every path out of a
//! branch (success, error, panic unwinding) without the branch having to
//! remember it, and a cancelled `acquire` never produces a permit to leak.
//!
//! A gate configured with a maximum of zero is unbounded: `acquire` returns
//! immediately with an empty permit.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

/// Errors raised by the admission gate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    /// The gate was closed while (or before) waiting for a permit
    #[error("Admission gate closed; no permits can be acquired")]
    Closed,
}

/// Concurrency limiter shared by the branches of one or more fan-outs
///
/// Cloning the gate shares the underlying permit pool.
#[derive(Debug, Clone, Default)]
pub struct AdmissionGate {
    inner: Option<Arc<BoundedGate>>,
}

#[derive(Debug)]
struct BoundedGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl AdmissionGate {
    /// Create a gate allowing at most `max_concurrency` holders at once
    ///
    /// A value of zero creates an unbounded gate.
    pub fn new(max_concurrency: usize) -> Self {
        if max_concurrency == 0 {
            return Self::unbounded();
        }

        Self {
            inner: Some(Arc::new(BoundedGate {
                semaphore: Arc::new(Semaphore::new(max_concurrency)),
                capacity: max_concurrency,
            })),
        }
    }

    /// Create a gate that never blocks
    pub fn unbounded() -> Self {
        Self { inner: None }
    }

    pub fn is_bounded(&self) -> bool {
        self.inner.is_some()
    }

    /// Configured maximum, or `None` for an unbounded gate
    pub fn capacity(&self) -> Option<usize> {
        self.inner.as_ref().map(|gate| gate.capacity)
    }

    /// Permits currently available, or `None` for an unbounded gate
    pub fn available_permits(&self) -> Option<usize> {
        self.inner
            .as_ref()
            .map(|gate| gate.semaphore.available_permits())
    }

    /// Permits currently held by callers (always zero when unbounded)
    pub fn in_use(&self) -> usize {
        match &self.inner {
            Some(gate) => gate
                .capacity
                .saturating_sub(gate.semaphore.available_permits()),
            None => 0,
        }
    }

    /// Wait for a permit
    ///
    /// Cancel safe: dropping the returned future before it resolves does not
    /// consume a permit.
    pub async fn acquire(&self) -> Result<AdmissionPermit, GateError> {
        let Some(gate) = &self.inner else {
            return Ok(AdmissionPermit { permit: None });
        };

        let permit = gate
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| GateError::Closed)?;

        debug!(
            capacity = gate.capacity,
            available = gate.semaphore.available_permits(),
            "Admission permit acquired"
        );

        Ok(AdmissionPermit {
            permit: Some(permit),
        })
    }

    /// Close the gate; pending and future `acquire` calls fail with [`GateError::Closed`]
    ///
    /// Permits already handed out stay valid and are returned normally on drop.
    pub fn close(&self) {
        if let Some(gate) = &self.inner {
            gate.semaphore.close();
        }
    }
}

/// Proof of admission; returns its permit to the gate when dropped
#[derive(Debug)]
#[must_use = "dropping the permit releases it immediately"]
pub struct AdmissionPermit {
    permit: Option<OwnedSemaphorePermit>,
}

impl AdmissionPermit {
    /// Whether this permit came from a bounded gate
    pub fn is_gated(&self) -> bool {
        self.permit.is_some()
    }

    /// Return the permit to the gate now
    pub fn release(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_zero_capacity_is_unbounded() {
        let gate = AdmissionGate::new(0);
        assert!(!gate.is_bounded());
        assert_eq!(gate.capacity(), None);

        let permits: Vec<_> = futures::future::join_all((0..64).map(|_| gate.acquire()))
            .await
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap();
        assert!(permits.iter().all(|p| !p.is_gated()));
        assert_eq!(gate.in_use(), 0);
    }

    #[tokio::test]
    async fn test_permit_released_on_drop() {
        let gate = AdmissionGate::new(2);
        let first = gate.acquire().await.unwrap();
        let second = gate.acquire().await.unwrap();
        assert_eq!(gate.in_use(), 2);
        assert_eq!(gate.available_permits(), Some(0));

        first.release();
        assert_eq!(gate.in_use(), 1);
        drop(second);
        assert_eq!(gate.available_permits(), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_blocks_until_release() {
        let gate = AdmissionGate::new(1);
        let held = gate.acquire().await.unwrap();

        let waiter = tokio::spawn({
            let gate = gate.clone();
            async move { gate.acquire().await.map(|_| ()) }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(held);
        waiter.await.unwrap().unwrap();
        assert_eq!(gate.available_permits(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_acquire_does_not_leak() {
        let gate = AdmissionGate::new(1);
        let held = gate.acquire().await.unwrap();

        let attempt = tokio::time::timeout(Duration::from_millis(10), gate.acquire()).await;
        assert!(attempt.is_err());

        drop(held);
        assert_eq!(gate.available_permits(), Some(1));
    }

    #[tokio::test]
    async fn test_closed_gate_rejects_acquire() {
        let gate = AdmissionGate::new(1);
        let held = gate.acquire().await.unwrap();
        gate.close();

        assert_eq!(gate.acquire().await.unwrap_err(), GateError::Closed);
        drop(held);
    }
}
