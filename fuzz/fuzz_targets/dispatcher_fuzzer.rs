//! Fuzz target for [`Dispatcher`] and the run controller
//!
//! # Strategy
//!
//! - Request sequences: generated against the demo platform's names, plus
//!   raw garbage payloads
//! - Interrupts: arbitrary signal bytes delivered between kernel units
//! - Bounded runs: unbounded runs are paused after a fixed unit budget
//!
//! # Invariants
//!
//! - Virtual time and the delta counter never go backwards
//! - Every run ends Idle or Terminated, never Running
//! - NEVER panic, whatever a command handler does

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use vsp_core::{Dispatcher, Kernel, Progress, Response, RunState};
use vsp_proto::Signal;
use vsp_sim::{EventKernel, Operation, demo_platform};

/// Kernel units a single run may take before it is paused.
const UNIT_BUDGET: usize = 2_000;

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    operations: Vec<Operation>,
    /// `(unit index, byte)` pairs delivered during runs
    signals: Vec<(u8, u8)>,
}

fuzz_target!(|input: FuzzInput| {
    let mut kernel = EventKernel::new();
    let platform = demo_platform(&mut kernel);
    let mut dispatcher = Dispatcher::new(kernel, platform);
    let mut last = (dispatcher.kernel().now(), dispatcher.kernel().delta_count());
    let mut signals = input.signals.iter().copied();

    for op in &input.operations {
        // the session closes the connection once terminated
        if dispatcher.state() == RunState::Terminated {
            break;
        }

        if let Response::Run(request) = dispatcher.handle_packet(&op.to_payload()) {
            dispatcher.begin_run(request).expect("idle dispatcher must start a run");

            let mut pending = signals.next();
            let mut unit = 0usize;
            loop {
                if let Some((at, byte)) = pending {
                    if usize::from(at) == unit {
                        if dispatcher.signal(byte).is_err() {
                            let _ = dispatcher.interrupt(Signal::Pause);
                        }
                        pending = signals.next();
                    }
                }
                if unit == UNIT_BUDGET {
                    let _ = dispatcher.interrupt(Signal::Pause);
                }
                if dispatcher.run_unit().expect("running") == Progress::Settled {
                    break;
                }
                unit += 1;
            }
            dispatcher.finish_run(true).expect("running");
        }

        assert_ne!(dispatcher.state(), RunState::Running);
        let now = (dispatcher.kernel().now(), dispatcher.kernel().delta_count());
        assert!(now >= last, "time went backwards: {last:?} -> {now:?}");
        last = now;
    }
});
