//! Shared fixtures for the dispatcher and run tests.

#![allow(dead_code)]

use vsp_core::{CommandError, CommandOutput, Dispatcher, Response, RunOutcome};
use vsp_sim::{Component, EventKernel, Platform, Property};

pub type TestDispatcher = Dispatcher<EventKernel, Platform>;

/// Platform with a top-level `device` (reg0 = 7) next to a small system.
///
/// ```text
/// system
///   └─ bus
///        └─ uart   (attribute baud)
/// device           (attributes reg0, status; commands reset, echo, explode)
/// ```
pub fn fixture_platform() -> Platform {
    let uart =
        Component::new("uart", "serial").with_attribute(Property::unsigned("baud", 115_200, 4));
    let bus = Component::new("bus", "bus").with_child(uart);
    let system = Component::new("system", "system").with_child(bus);

    let device = Component::new("device", "device")
        .with_attribute(Property::unsigned("reg0", 7, 4))
        .with_attribute(Property::text("status", "idle").read_only())
        .with_command("reset", 0, "reset the device", |_| {
            Err(CommandError::Failed("bad state".to_string()))
        })
        .with_command("echo", 1, "echo arguments", |args| Ok(CommandOutput::ok(args.join(" "))))
        .with_command("explode", 0, "always panics", |_| panic!("kaboom"));

    Platform::new().with(system).with(device)
}

/// Dispatcher over [`fixture_platform`] with an empty kernel.
pub fn fixture() -> TestDispatcher {
    Dispatcher::new(EventKernel::new(), fixture_platform())
}

/// Send `payload` and return the immediate reply text.
pub fn reply(dispatcher: &mut TestDispatcher, payload: &str) -> String {
    match dispatcher.handle_packet(payload) {
        Response::Reply(text) | Response::Quit(text) => text,
        Response::Run(request) => panic!("unexpected run request {request:?} for {payload}"),
    }
}

/// Send `payload`, run any requested run to completion and return the reply
/// text (or the terminal packet).
pub fn exchange(dispatcher: &mut TestDispatcher, payload: &str) -> String {
    match dispatcher.handle_packet(payload) {
        Response::Reply(text) | Response::Quit(text) => text,
        Response::Run(request) => match dispatcher.run(request).unwrap() {
            RunOutcome::Reply(text) => text,
            RunOutcome::Terminate { packet } => packet.to_string(),
        },
    }
}
