//! Sans-IO core of the vsp simulation control server.
//!
//! The core never touches a socket. The server feeds it packet payloads and
//! interrupt bytes and executes what it returns, while the simulation itself
//! is reached only through the [`Kernel`] and [`Registry`] traits.
//!
//! ## Architecture
//!
//! ```text
//! vsp-core
//!   ├─ SimTime        (virtual time, picosecond resolution)
//!   ├─ Kernel         (external cooperative scheduler)
//!   ├─ Registry       (external object tree: nodes, attributes, commands)
//!   ├─ introspect     (name resolution, describe, notification waves)
//!   ├─ Dispatcher     (command code -> handler table)
//!   └─ RunController  (Idle / Running / Terminated state machine)
//! ```
//!
//! # Invariants
//!
//! - No reply is produced while the kernel is mid-run, except the answer to
//!   a time-update interrupt.
//! - A run reply is produced only after the resume notification wave and the
//!   kernel has settled.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod dispatch;
pub mod error;
pub mod introspect;
pub mod kernel;
pub mod object;
pub mod run;
pub mod time;

pub use dispatch::{Dispatcher, Handler, Response};
pub use error::ControlError;
pub use introspect::{Description, Target, describe, find_attribute, find_object};
pub use kernel::{Advance, Kernel, SimStatus};
pub use object::{
    Attribute, AttributeError, Capabilities, CommandError, CommandInfo, CommandOutput, ObjectNode,
    Registry,
};
pub use run::{Progress, RunController, RunOutcome, RunRequest, RunState, SignalResponse};
pub use time::SimTime;
