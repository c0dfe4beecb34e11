//! Cooperative event kernel.
//!
//! Processes are resumed from a time-ordered queue. One call to
//! [`Kernel::advance`] executes one delta cycle: every process due at the
//! earliest pending instant, in scheduling order. Processes rescheduled with
//! a zero delay run in the next delta cycle at the same instant.
//!
//! # Invariants
//!
//! - `now` and the delta counter never decrease.
//! - Events scheduled exactly at the run deadline execute before the run
//!   settles.
//! - Once the status is [`SimStatus::Error`], `stop` leaves it in place.

use std::{cmp::Ordering, collections::BinaryHeap, fmt};

use tracing::{debug, error};
use vsp_core::{Advance, Kernel, SimStatus, SimTime};

/// Default scheduling quantum.
pub const DEFAULT_QUANTUM: SimTime = SimTime::from_us(1);

/// What a process wants after being resumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wake {
    /// Resume again after this delay
    After(SimTime),
    /// Process has finished
    Done,
    /// Process hit a fatal condition
    Fail(String),
}

/// Simulation process resumed by the kernel.
pub trait Process {
    /// Run until the next suspension point.
    fn wake(&mut self, now: SimTime) -> Wake;
}

impl<F: FnMut(SimTime) -> Wake> Process for F {
    fn wake(&mut self, now: SimTime) -> Wake {
        self(now)
    }
}

/// Queue entry ordered so that [`BinaryHeap`] pops the earliest wake-up
/// first, ties broken by scheduling order.
struct Scheduled {
    at: SimTime,
    seq: u64,
    process: Box<dyn Process>,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        (self.at, self.seq) == (other.at, other.seq)
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.at, other.seq).cmp(&(self.at, self.seq))
    }
}

/// Event-queue kernel implementing [`Kernel`].
pub struct EventKernel {
    now: SimTime,
    deltas: u64,
    quantum: SimTime,
    status: SimStatus,
    paused: bool,
    next_seq: u64,
    queue: BinaryHeap<Scheduled>,
}

impl fmt::Debug for EventKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventKernel")
            .field("now", &self.now)
            .field("deltas", &self.deltas)
            .field("quantum", &self.quantum)
            .field("status", &self.status)
            .field("pending", &self.queue.len())
            .finish_non_exhaustive()
    }
}

impl Default for EventKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl EventKernel {
    /// Create an empty kernel at time zero.
    pub fn new() -> Self {
        Self {
            now: SimTime::ZERO,
            deltas: 0,
            quantum: DEFAULT_QUANTUM,
            status: SimStatus::Ok,
            paused: false,
            next_seq: 0,
            queue: BinaryHeap::new(),
        }
    }

    /// Schedule `process` to run `delay` after the current time.
    pub fn spawn(&mut self, process: impl Process + 'static, delay: SimTime) {
        self.schedule(self.now.saturating_add(delay), Box::new(process));
    }

    /// Number of scheduled process wake-ups.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    fn schedule(&mut self, at: SimTime, process: Box<dyn Process>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Scheduled { at, seq, process });
    }

    fn run_delta_cycle(&mut self, at: SimTime) {
        self.now = at;

        let mut due = Vec::new();
        while self.queue.peek().is_some_and(|next| next.at == at) {
            due.extend(self.queue.pop());
        }

        for Scheduled { mut process, .. } in due {
            match process.wake(at) {
                Wake::After(delay) => self.schedule(at.saturating_add(delay), process),
                Wake::Done => {},
                Wake::Fail(reason) => {
                    error!(time = %at, %reason, "process failed");
                    self.status = SimStatus::Error;
                },
            }
        }

        self.deltas += 1;
    }
}

impl Kernel for EventKernel {
    fn now(&self) -> SimTime {
        self.now
    }

    fn delta_count(&self) -> u64 {
        self.deltas
    }

    fn quantum(&self) -> SimTime {
        self.quantum
    }

    fn set_quantum(&mut self, quantum: SimTime) {
        self.quantum = quantum;
    }

    fn next_event(&self) -> Option<SimTime> {
        self.queue.peek().map(|next| next.at)
    }

    fn advance(&mut self, deadline: Option<SimTime>) -> Advance {
        if self.paused {
            self.paused = false;
            debug!(time = %self.now, "paused");
            return Advance::Settled;
        }
        if self.status != SimStatus::Ok {
            return Advance::Settled;
        }

        match (self.next_event(), deadline) {
            (Some(next), Some(deadline)) if next > deadline => {
                self.now = self.now.max(deadline);
                Advance::Settled
            },
            (Some(next), _) => {
                self.run_delta_cycle(next);
                Advance::Busy
            },
            (None, Some(deadline)) => {
                self.now = self.now.max(deadline);
                Advance::Settled
            },
            (None, None) => Advance::Settled,
        }
    }

    fn stop(&mut self) {
        if self.status == SimStatus::Ok {
            self.status = SimStatus::UserStop;
        }
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn status(&self) -> SimStatus {
        self.status
    }

    fn version(&self) -> String {
        format!("vsp-sim {}", env!("CARGO_PKG_VERSION"))
    }
}
