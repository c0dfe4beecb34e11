//! Command dispatcher.
//!
//! Maps single-letter command codes to handlers. Handlers answer queries
//! directly; `s` and `c` only describe the run they want and leave driving it
//! to the caller, which owns the connection and can interleave interrupts.
//!
//! | code | args | reply |
//! |---|---|---|
//! | `n` | | empty |
//! | `s` | `[seconds]` | `OK` after the run |
//! | `c` | | `OK` after the run |
//! | `i` | `[name]` | node description |
//! | `e` | `name,cmd,args..` | `OK,<out>` / `ERROR,<msg>` |
//! | `t` | | `<nanos>,<delta>` |
//! | `q` | | quantum in seconds |
//! | `Q` | `seconds` | `OK` |
//! | `a` | `name` | `<name>,<value>,<size>,<num>` |
//! | `A` | `name,value` | `OK` |
//! | `x` | | `OK`, then the session ends |
//! | `v` | | `<kernel>,<version>[-debug]` |

use std::{
    any::Any,
    collections::BTreeMap,
    panic::{AssertUnwindSafe, catch_unwind},
};

use tracing::{debug, warn};
use vsp_proto::{FIELD_DELIMITER, Request, Signal, escape, reply};

use crate::{
    error::ControlError,
    introspect::{describe, find_attribute, find_attribute_mut, find_object, find_object_mut},
    kernel::Kernel,
    object::{AttributeError, Capabilities, CommandError, CommandOutput, ObjectNode, Registry},
    run::{Progress, RunController, RunOutcome, RunRequest, RunState, SignalResponse, time_reply},
    time::SimTime,
};

/// What the caller must do with a handled packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Send this reply (nothing if empty)
    Reply(String),
    /// Start a run; the reply comes from [`Dispatcher::finish_run`]
    Run(RunRequest),
    /// Send this reply, then end the session
    Quit(String),
}

/// Handler for one command code.
pub type Handler<K, R> = fn(&mut Dispatcher<K, R>, &Request) -> Response;

/// Routes requests to handlers and owns the run controller.
pub struct Dispatcher<K, R> {
    kernel: K,
    registry: R,
    controller: RunController,
    handlers: BTreeMap<char, Handler<K, R>>,
}

impl<K: Kernel, R: Registry> Dispatcher<K, R> {
    /// Create a dispatcher with the standard command table.
    pub fn new(kernel: K, registry: R) -> Self {
        let mut dispatcher =
            Self { kernel, registry, controller: RunController::new(), handlers: BTreeMap::new() };

        dispatcher.register('n', handle_noop);
        dispatcher.register('s', handle_step);
        dispatcher.register('c', handle_continue);
        dispatcher.register('i', handle_info);
        dispatcher.register('e', handle_execute);
        dispatcher.register('t', handle_time);
        dispatcher.register('q', handle_quantum);
        dispatcher.register('Q', handle_set_quantum);
        dispatcher.register('a', handle_attribute);
        dispatcher.register('A', handle_set_attribute);
        dispatcher.register('x', handle_quit);
        dispatcher.register('v', handle_version);
        dispatcher
    }

    /// Install or replace the handler for `code`.
    pub fn register(&mut self, code: char, handler: Handler<K, R>) -> Option<Handler<K, R>> {
        self.handlers.insert(code, handler)
    }

    /// Parse and route one packet payload.
    ///
    /// Unknown codes and empty payloads get an empty reply.
    pub fn handle_packet(&mut self, payload: &str) -> Response {
        let request = Request::parse(payload);
        let Some(code) = request.code() else {
            debug!(payload, "ignoring packet without command code");
            return Response::Reply(String::new());
        };
        let Some(&handler) = self.handlers.get(&code) else {
            debug!(%code, "unknown command");
            return Response::Reply(String::new());
        };

        debug!(%code, fields = request.field_count(), "dispatching");
        handler(self, &request)
    }

    /// Zero-duration setup pass before commands are accepted.
    pub fn settle(&mut self) -> Result<(), ControlError> {
        self.controller.settle(&mut self.kernel)
    }

    /// Enter Running for `request`.
    pub fn begin_run(&mut self, request: RunRequest) -> Result<(), ControlError> {
        self.controller.begin(&self.kernel, &mut self.registry, request)
    }

    /// Execute one atomic kernel unit of the current run.
    pub fn run_unit(&mut self) -> Result<Progress, ControlError> {
        self.controller.step(&mut self.kernel)
    }

    /// Deliver a raw out-of-band byte to the current run.
    pub fn signal(&mut self, byte: u8) -> Result<SignalResponse, ControlError> {
        self.controller.signal(&mut self.kernel, byte)
    }

    /// Deliver a decoded signal to the current run.
    pub fn interrupt(&mut self, signal: Signal) -> Result<SignalResponse, ControlError> {
        self.controller.interrupt(&mut self.kernel, signal)
    }

    /// Leave Running and classify the kernel status.
    pub fn finish_run(&mut self, connected: bool) -> Result<RunOutcome, ControlError> {
        self.controller.finish(&mut self.kernel, &mut self.registry, connected)
    }

    /// Run `request` to completion without interruption.
    pub fn run(&mut self, request: RunRequest) -> Result<RunOutcome, ControlError> {
        self.begin_run(request)?;
        while self.run_unit()? == Progress::Busy {}
        self.finish_run(true)
    }

    /// Stop the kernel and end the session.
    pub fn quit(&mut self) -> Result<(), ControlError> {
        self.controller.quit(&mut self.kernel)
    }

    /// Current run state.
    pub const fn state(&self) -> RunState {
        self.controller.state()
    }

    /// Driven kernel.
    pub const fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Driven kernel, mutably.
    pub fn kernel_mut(&mut self) -> &mut K {
        &mut self.kernel
    }

    /// Object tree.
    pub const fn registry(&self) -> &R {
        &self.registry
    }
}

fn insufficient(request: &Request) -> Response {
    Response::Reply(format!("insufficient arguments {}", request.field_count()))
}

fn failure(message: &str) -> Response {
    Response::Reply(format!("{},{}", reply::ERROR, escape(message, FIELD_DELIMITER)))
}

fn handle_noop<K: Kernel, R: Registry>(_: &mut Dispatcher<K, R>, _: &Request) -> Response {
    Response::Reply(String::new())
}

fn handle_step<K: Kernel, R: Registry>(d: &mut Dispatcher<K, R>, request: &Request) -> Response {
    let duration = match request.field(1) {
        Some(text) => match SimTime::parse_secs(text) {
            Some(duration) => duration,
            None => return Response::Reply(format!("invalid duration '{text}'")),
        },
        None => match d.kernel.next_event() {
            Some(at) => at.saturating_sub(d.kernel.now()),
            None => d.kernel.quantum(),
        },
    };
    Response::Run(RunRequest::new(duration))
}

fn handle_continue<K: Kernel, R: Registry>(_: &mut Dispatcher<K, R>, _: &Request) -> Response {
    Response::Run(RunRequest::UNBOUNDED)
}

fn handle_info<K: Kernel, R: Registry>(d: &mut Dispatcher<K, R>, request: &Request) -> Response {
    let name = request.field(1).unwrap_or_default();
    match find_object(&d.registry, name) {
        Some(target) => Response::Reply(describe(target).to_string()),
        None => Response::Reply(format!("object '{name}' not found")),
    }
}

fn handle_execute<K: Kernel, R: Registry>(d: &mut Dispatcher<K, R>, request: &Request) -> Response {
    let (Some(name), Some(command)) = (request.field(1), request.field(2)) else {
        return insufficient(request);
    };
    let args = request.fields_from(3);

    let Some(node) = find_object_mut(&mut d.registry, name) else {
        return Response::Reply(format!("object '{name}' not found"));
    };
    if !node.capabilities().contains(Capabilities::COMMAND_HOLDER) {
        return Response::Reply(format!("object '{name}' does not support commands"));
    }
    let Some(info) = node.commands().into_iter().find(|c| c.name == command) else {
        return Response::Reply(format!("command '{command}' not found"));
    };
    if args.len() < info.argc {
        let err = CommandError::MissingArguments {
            command: info.name,
            expected: info.argc,
            actual: args.len(),
        };
        return failure(&err.to_string());
    }

    match execute_guarded(node, command, args) {
        Ok(output) => {
            let status = if output.success { reply::OK } else { reply::ERROR };
            Response::Reply(format!("{status},{}", escape(&output.text, FIELD_DELIMITER)))
        },
        Err(message) => {
            debug!(name, command, %message, "command failed");
            failure(&message)
        },
    }
}

/// Invoke a command, converting both errors and panics into a message.
fn execute_guarded(
    node: &mut dyn ObjectNode,
    command: &str,
    args: &[String],
) -> Result<CommandOutput, String> {
    match catch_unwind(AssertUnwindSafe(|| node.execute(command, args))) {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(err)) => Err(err.to_string()),
        Err(payload) => {
            let message = panic_message(&*payload);
            warn!(command, %message, "command panicked");
            Err(message)
        },
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "command panicked".to_string()
    }
}

fn handle_time<K: Kernel, R: Registry>(d: &mut Dispatcher<K, R>, _: &Request) -> Response {
    Response::Reply(time_reply(&d.kernel))
}

fn handle_quantum<K: Kernel, R: Registry>(d: &mut Dispatcher<K, R>, _: &Request) -> Response {
    Response::Reply(format!("{:.12}", d.kernel.quantum().as_secs_f64()))
}

fn handle_set_quantum<K: Kernel, R: Registry>(
    d: &mut Dispatcher<K, R>,
    request: &Request,
) -> Response {
    let Some(text) = request.field(1) else {
        return insufficient(request);
    };
    let Some(quantum) = SimTime::parse_secs(text) else {
        return Response::Reply(format!("invalid quantum '{text}'"));
    };

    d.kernel.set_quantum(quantum);
    debug!(%quantum, "quantum updated");
    Response::Reply(reply::OK.to_string())
}

fn handle_attribute<K: Kernel, R: Registry>(
    d: &mut Dispatcher<K, R>,
    request: &Request,
) -> Response {
    let Some(name) = request.field(1) else {
        return insufficient(request);
    };
    match find_attribute(&d.registry, name) {
        Some(attribute) => Response::Reply(format!(
            "{},{},{},{}",
            escape(name, FIELD_DELIMITER),
            escape(&attribute.value(), FIELD_DELIMITER),
            attribute.size(),
            attribute.num()
        )),
        None => Response::Reply(format!("attribute '{name}' not found")),
    }
}

fn handle_set_attribute<K: Kernel, R: Registry>(
    d: &mut Dispatcher<K, R>,
    request: &Request,
) -> Response {
    let (Some(name), Some(value)) = (request.field(1), request.field(2)) else {
        return insufficient(request);
    };
    let Some(attribute) = find_attribute_mut(&mut d.registry, name) else {
        return Response::Reply(format!("attribute '{name}' not found"));
    };
    if !attribute.is_writable() {
        return Response::Reply(format!("attribute '{name}' not writable"));
    }

    match attribute.set_value(value) {
        Ok(()) => Response::Reply(reply::OK.to_string()),
        Err(AttributeError::ReadOnly) => {
            Response::Reply(format!("attribute '{name}' not writable"))
        },
        Err(err) => Response::Reply(format!("attribute '{name}' rejected value: {err}")),
    }
}

fn handle_quit<K: Kernel, R: Registry>(d: &mut Dispatcher<K, R>, _: &Request) -> Response {
    if let Err(err) = d.quit() {
        warn!(%err, "quit while not idle");
    }
    Response::Quit(reply::OK.to_string())
}

fn handle_version<K: Kernel, R: Registry>(d: &mut Dispatcher<K, R>, _: &Request) -> Response {
    let suffix = if cfg!(debug_assertions) { "-debug" } else { "" };
    Response::Reply(format!("{},{}{suffix}", d.kernel.version(), env!("CARGO_PKG_VERSION")))
}
