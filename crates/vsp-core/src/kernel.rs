//! External scheduler abstraction.
//!
//! The kernel owns the simulation's event queue and advances virtual time on
//! a single cooperative thread. The control server never preempts it: it
//! asks for one atomic unit of work at a time through [`Kernel::advance`]
//! and gets a chance to look at the connection between units.
//!
//! # Invariants
//!
//! - Monotonicity: `now()` never decreases and `delta_count()` never
//!   decreases.
//! - Atomic units: `advance()` either completes a whole unit (one delta
//!   cycle) or does no work at all.
//! - Terminal status: once `status()` reports [`SimStatus::Error`],
//!   `stop()` must not replace it.

use crate::time::SimTime;

/// Run status reported by the kernel after returning control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimStatus {
    /// Simulation may continue
    #[default]
    Ok,
    /// Simulation was stopped on request
    UserStop,
    /// Simulation hit a fatal internal condition
    Error,
}

/// Result of a single [`Kernel::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// A unit of work ran; more may be pending before the deadline.
    Busy,
    /// Nothing more to do: deadline reached, no pending activity, paused, or
    /// stopped.
    Settled,
}

/// Cooperative discrete-event scheduler driven by the control server.
pub trait Kernel {
    /// Current virtual time.
    fn now(&self) -> SimTime;

    /// Number of delta cycles executed so far.
    fn delta_count(&self) -> u64;

    /// Scheduling quantum.
    fn quantum(&self) -> SimTime;

    /// Replace the scheduling quantum.
    fn set_quantum(&mut self, quantum: SimTime);

    /// Absolute time of the earliest pending event, if any.
    fn next_event(&self) -> Option<SimTime>;

    /// Run one atomic unit of work without passing `deadline`.
    ///
    /// With `Some(deadline)` the kernel executes activity up to and including
    /// `deadline` and moves its clock to `deadline` once nothing is left.
    /// With `None` it runs until no activity is pending.
    fn advance(&mut self, deadline: Option<SimTime>) -> Advance;

    /// Request a stop; the next `advance` settles and the status becomes
    /// [`SimStatus::UserStop`] unless it already reports an error.
    fn stop(&mut self);

    /// Request a pause; the next `advance` settles with the status left
    /// unchanged.
    fn pause(&mut self);

    /// Status after the last `advance`.
    fn status(&self) -> SimStatus;

    /// Kernel name and version.
    fn version(&self) -> String;
}
