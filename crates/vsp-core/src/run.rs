//! Run controller.
//!
//! Hands the kernel back to the simulation for a bounded or unbounded span of
//! virtual time while staying interruptible. The controller does no I/O: the
//! caller drives it one atomic kernel unit at a time with [`RunController::step`]
//! and feeds out-of-band bytes in between with [`RunController::signal`].
//!
//! ```text
//!            begin              finish (status Ok)
//!   Idle ────────────▶ Running ────────────────────▶ Idle
//!    │                   │
//!    │ quit              │ finish (UserStop / Error)
//!    ▼                   ▼
//!   Terminated ◀─────────┘
//! ```
//!
//! # Invariants
//!
//! - The suspend wave completes before the first kernel unit of a run, and
//!   the resume wave completes before the run's status is classified.
//! - Pause and Terminate never cut a unit short: they take effect when the
//!   in-flight `advance` call returns.
//! - A terminal kernel status always wins over the pending reply.

use tracing::{debug, error, info};
use vsp_proto::{Signal, reply};

use crate::{
    error::ControlError,
    introspect::{notify_resume, notify_suspend},
    kernel::{Advance, Kernel, SimStatus},
    object::Registry,
    time::SimTime,
};

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    /// Kernel stopped, awaiting a command
    #[default]
    Idle,
    /// Kernel advancing virtual time
    Running,
    /// Session over, kernel stopped
    Terminated,
}

/// Requested span of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunRequest {
    duration: SimTime,
}

impl RunRequest {
    /// Run until the simulation suspends on its own.
    pub const UNBOUNDED: Self = Self { duration: SimTime::ZERO };

    /// Run for `duration` of virtual time; zero means unbounded.
    pub const fn new(duration: SimTime) -> Self {
        Self { duration }
    }

    /// Requested duration (zero for unbounded).
    pub const fn duration(&self) -> SimTime {
        self.duration
    }

    /// Whether the run ends only when the simulation suspends.
    pub const fn is_unbounded(&self) -> bool {
        self.duration.is_zero()
    }
}

/// Result of one [`RunController::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// More units may follow
    Busy,
    /// Kernel returned control; call [`RunController::finish`]
    Settled,
}

/// What to do after delivering a signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalResponse {
    /// Keep stepping
    Continue,
    /// Send this reply immediately and keep stepping
    Reply(String),
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Back to idle; send the reply unless it is empty
    Reply(String),
    /// Session over; send `packet` and close the connection
    Terminate {
        /// Fixed terminal packet
        packet: &'static str,
    },
}

/// Idle / Running / Terminated state machine around a [`Kernel`].
#[derive(Debug, Default)]
pub struct RunController {
    state: RunState,
    deadline: Option<SimTime>,
}

impl RunController {
    /// Create an idle controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// Let the kernel finish its zero-duration setup pass.
    pub fn settle(&self, kernel: &mut dyn Kernel) -> Result<(), ControlError> {
        self.require(RunState::Idle)?;
        let now = kernel.now();
        while kernel.advance(Some(now)) == Advance::Busy {}
        debug!(time = %kernel.now(), deltas = kernel.delta_count(), "kernel settled");
        Ok(())
    }

    /// Enter Running: suspend wave, then fix the deadline.
    pub fn begin(
        &mut self,
        kernel: &dyn Kernel,
        registry: &mut dyn Registry,
        request: RunRequest,
    ) -> Result<(), ControlError> {
        self.require(RunState::Idle)?;

        notify_suspend(registry);
        let now = kernel.now();
        self.deadline =
            (!request.is_unbounded()).then(|| now.saturating_add(request.duration()));
        self.state = RunState::Running;

        debug!(from = %now, duration = %request.duration(), "run started");
        Ok(())
    }

    /// Execute one atomic kernel unit bounded by the deadline.
    pub fn step(&self, kernel: &mut dyn Kernel) -> Result<Progress, ControlError> {
        self.require(RunState::Running)?;
        Ok(match kernel.advance(self.deadline) {
            Advance::Busy => Progress::Busy,
            Advance::Settled => Progress::Settled,
        })
    }

    /// Deliver a raw out-of-band byte.
    ///
    /// Unknown bytes are fatal and leave the kernel untouched; the caller
    /// decides how to wind the run down.
    pub fn signal(
        &self,
        kernel: &mut dyn Kernel,
        byte: u8,
    ) -> Result<SignalResponse, ControlError> {
        let signal = Signal::from_byte(byte).ok_or(ControlError::UnknownSignal(byte))?;
        self.interrupt(kernel, signal)
    }

    /// Deliver a decoded signal.
    pub fn interrupt(
        &self,
        kernel: &mut dyn Kernel,
        signal: Signal,
    ) -> Result<SignalResponse, ControlError> {
        self.require(RunState::Running)?;
        debug!(?signal, time = %kernel.now(), "signal received");

        match signal {
            Signal::Terminate => {
                kernel.stop();
                Ok(SignalResponse::Continue)
            },
            Signal::Pause => {
                kernel.pause();
                Ok(SignalResponse::Continue)
            },
            Signal::TimeUpdate => Ok(SignalResponse::Reply(time_reply(kernel))),
        }
    }

    /// Leave Running: resume wave, then classify the kernel status.
    ///
    /// `connected` tells whether the client is still there to receive the
    /// normal-completion reply.
    pub fn finish(
        &mut self,
        kernel: &mut dyn Kernel,
        registry: &mut dyn Registry,
        connected: bool,
    ) -> Result<RunOutcome, ControlError> {
        self.require(RunState::Running)?;

        notify_resume(registry);
        self.deadline = None;

        match kernel.status() {
            SimStatus::Ok => {
                self.state = RunState::Idle;
                debug!(time = %kernel.now(), connected, "run finished");
                let reply = if connected { reply::OK.to_string() } else { String::new() };
                Ok(RunOutcome::Reply(reply))
            },
            SimStatus::Error => {
                error!(time = %kernel.now(), "simulation reported an internal error");
                kernel.stop();
                self.state = RunState::Terminated;
                Ok(RunOutcome::Terminate { packet: reply::ERR_INTERNAL })
            },
            SimStatus::UserStop => {
                info!(time = %kernel.now(), "simulation stopped");
                kernel.stop();
                self.state = RunState::Terminated;
                Ok(RunOutcome::Terminate { packet: reply::STOP })
            },
        }
    }

    /// Idle to Terminated, stopping the kernel. Repeated calls are no-ops.
    pub fn quit(&mut self, kernel: &mut dyn Kernel) -> Result<(), ControlError> {
        match self.state {
            RunState::Running => Err(ControlError::AlreadyRunning),
            RunState::Terminated => Ok(()),
            RunState::Idle => {
                kernel.stop();
                self.state = RunState::Terminated;
                info!(time = %kernel.now(), "session quit");
                Ok(())
            },
        }
    }

    fn require(&self, expected: RunState) -> Result<(), ControlError> {
        match (self.state, expected) {
            (actual, expected) if actual == expected => Ok(()),
            (RunState::Terminated, _) => Err(ControlError::Terminated),
            (RunState::Running, _) => Err(ControlError::AlreadyRunning),
            (RunState::Idle, _) => Err(ControlError::NotRunning),
        }
    }
}

/// `<nanos>,<delta>` reply for the current kernel time.
pub fn time_reply(kernel: &dyn Kernel) -> String {
    format!("{},{}", kernel.now().as_nanos(), kernel.delta_count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectNode;

    /// Kernel with one unit of work every nanosecond, forever.
    #[derive(Default)]
    struct Ticker {
        now: SimTime,
        deltas: u64,
        paused: bool,
        status: SimStatus,
        stops: usize,
        fail_at: Option<SimTime>,
    }

    impl Kernel for Ticker {
        fn now(&self) -> SimTime {
            self.now
        }

        fn delta_count(&self) -> u64 {
            self.deltas
        }

        fn quantum(&self) -> SimTime {
            SimTime::from_ns(1)
        }

        fn set_quantum(&mut self, _quantum: SimTime) {}

        fn next_event(&self) -> Option<SimTime> {
            Some(self.now.saturating_add(SimTime::from_ns(1)))
        }

        fn advance(&mut self, deadline: Option<SimTime>) -> Advance {
            if self.paused || self.status != SimStatus::Ok {
                self.paused = false;
                return Advance::Settled;
            }
            let next = self.now.saturating_add(SimTime::from_ns(1));
            if deadline.is_some_and(|d| next > d) {
                if let Some(d) = deadline {
                    self.now = d;
                }
                return Advance::Settled;
            }
            self.now = next;
            self.deltas += 1;
            if self.fail_at == Some(next) {
                self.status = SimStatus::Error;
            }
            Advance::Busy
        }

        fn stop(&mut self) {
            self.stops += 1;
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
            "ticker".to_string()
        }
    }

    struct Empty;

    impl Registry for Empty {
        fn top_level(&self) -> Vec<&dyn ObjectNode> {
            Vec::new()
        }

        fn top_level_mut(&mut self) -> Vec<&mut dyn ObjectNode> {
            Vec::new()
        }
    }

    fn run_to_settle(controller: &RunController, kernel: &mut Ticker) {
        while controller.step(kernel).unwrap() == Progress::Busy {}
    }

    #[test]
    fn bounded_run_stops_at_deadline() {
        let mut kernel = Ticker::default();
        let mut controller = RunController::new();

        controller.begin(&kernel, &mut Empty, RunRequest::new(SimTime::from_ns(5))).unwrap();
        assert_eq!(controller.state(), RunState::Running);
        run_to_settle(&controller, &mut kernel);

        let outcome = controller.finish(&mut kernel, &mut Empty, true).unwrap();
        assert_eq!(outcome, RunOutcome::Reply("OK".to_string()));
        assert_eq!(kernel.now, SimTime::from_ns(5));
        assert_eq!(controller.state(), RunState::Idle);
    }

    #[test]
    fn disconnected_run_has_empty_reply() {
        let mut kernel = Ticker::default();
        let mut controller = RunController::new();

        controller.begin(&kernel, &mut Empty, RunRequest::new(SimTime::from_ns(1))).unwrap();
        run_to_settle(&controller, &mut kernel);
        let outcome = controller.finish(&mut kernel, &mut Empty, false).unwrap();
        assert_eq!(outcome, RunOutcome::Reply(String::new()));
    }

    #[test]
    fn pause_takes_effect_after_current_unit() {
        let mut kernel = Ticker::default();
        let mut controller = RunController::new();

        controller.begin(&kernel, &mut Empty, RunRequest::UNBOUNDED).unwrap();
        assert_eq!(controller.step(&mut kernel).unwrap(), Progress::Busy);
        assert_eq!(controller.signal(&mut kernel, 0x03).unwrap(), SignalResponse::Continue);
        assert_eq!(controller.step(&mut kernel).unwrap(), Progress::Settled);

        let outcome = controller.finish(&mut kernel, &mut Empty, true).unwrap();
        assert_eq!(outcome, RunOutcome::Reply("OK".to_string()));
        assert_eq!(kernel.now, SimTime::from_ns(1));
    }

    #[test]
    fn terminate_ends_session_with_stop_packet() {
        let mut kernel = Ticker::default();
        let mut controller = RunController::new();

        controller.begin(&kernel, &mut Empty, RunRequest::UNBOUNDED).unwrap();
        controller.signal(&mut kernel, b'x').unwrap();
        run_to_settle(&controller, &mut kernel);

        let outcome = controller.finish(&mut kernel, &mut Empty, true).unwrap();
        assert_eq!(outcome, RunOutcome::Terminate { packet: "STOP" });
        assert_eq!(controller.state(), RunState::Terminated);
        assert_eq!(kernel.status, SimStatus::UserStop);
    }

    #[test]
    fn kernel_error_wins_over_reply() {
        let mut kernel = Ticker { fail_at: Some(SimTime::from_ns(2)), ..Ticker::default() };
        let mut controller = RunController::new();

        controller.begin(&kernel, &mut Empty, RunRequest::new(SimTime::from_ns(10))).unwrap();
        run_to_settle(&controller, &mut kernel);

        let outcome = controller.finish(&mut kernel, &mut Empty, true).unwrap();
        assert_eq!(outcome, RunOutcome::Terminate { packet: "E03" });
        assert_eq!(kernel.status, SimStatus::Error);
        assert_eq!(kernel.stops, 1);
    }

    #[test]
    fn time_update_keeps_running() {
        let mut kernel = Ticker::default();
        let mut controller = RunController::new();

        controller.begin(&kernel, &mut Empty, RunRequest::new(SimTime::from_ns(4))).unwrap();
        controller.step(&mut kernel).unwrap();
        controller.step(&mut kernel).unwrap();
        let response = controller.signal(&mut kernel, b'u').unwrap();
        assert_eq!(response, SignalResponse::Reply("2,2".to_string()));

        run_to_settle(&controller, &mut kernel);
        assert_eq!(kernel.now, SimTime::from_ns(4));
    }

    #[test]
    fn unknown_signal_is_fatal() {
        let mut kernel = Ticker::default();
        let mut controller = RunController::new();
        controller.begin(&kernel, &mut Empty, RunRequest::UNBOUNDED).unwrap();

        let err = controller.signal(&mut kernel, b'?').unwrap_err();
        assert_eq!(err, ControlError::UnknownSignal(b'?'));
        assert!(err.is_fatal());
    }

    #[test]
    fn state_misuse_is_rejected() {
        let mut kernel = Ticker::default();
        let mut controller = RunController::new();

        assert_eq!(controller.step(&mut kernel), Err(ControlError::NotRunning));
        controller.begin(&kernel, &mut Empty, RunRequest::UNBOUNDED).unwrap();
        assert_eq!(
            controller.begin(&kernel, &mut Empty, RunRequest::UNBOUNDED),
            Err(ControlError::AlreadyRunning)
        );
        assert_eq!(controller.quit(&mut kernel), Err(ControlError::AlreadyRunning));
    }

    #[test]
    fn quit_is_idempotent() {
        let mut kernel = Ticker::default();
        let mut controller = RunController::new();

        controller.quit(&mut kernel).unwrap();
        controller.quit(&mut kernel).unwrap();
        assert_eq!(controller.state(), RunState::Terminated);
        assert_eq!(kernel.stops, 1);
        assert_eq!(
            controller.begin(&kernel, &mut Empty, RunRequest::UNBOUNDED),
            Err(ControlError::Terminated)
        );
    }
}
