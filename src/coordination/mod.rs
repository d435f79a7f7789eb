//! # Coordination Primitives
//!
//! The two pieces of shared mutable state between concurrently running
//! branches:
//!
//! - [`AdmissionGate`]: bounds how many branches execute at once
//! - [`CompletionBarrier`]: lets the coordinator wait for all branches, with a deadline
//!
//! Both hand out RAII values ([`AdmissionPermit`], [`SignalGuard`]) so that
//! release and signal happen exactly once per branch by construction.

pub mod admission_gate;
pub mod completion_barrier;

pub use admission_gate::{AdmissionGate, AdmissionPermit, GateError};
pub use completion_barrier::{BarrierOutcome, CompletionBarrier, SignalGuard};
