//! Client operations for model-based testing.
//!
//! Operations are generated by proptest or the fuzzer and rendered to packet
//! payloads against the demo platform's names, so a random sequence mostly
//! exercises real handlers instead of the not-found paths.

use arbitrary::Arbitrary;
use vsp_proto::{FIELD_DELIMITER, escape};

/// Object names the demo platform knows, plus one it does not.
const OBJECTS: [&str; 5] = ["", "system", "system.timer", "system.device", "system.nowhere"];

/// Attribute names the demo platform knows, plus one it does not.
const ATTRIBUTES: [&str; 5] = [
    "system.device.reg0",
    "system.device.regs",
    "system.device.status",
    "system.timer.ticks",
    "system.device.missing",
];

/// Commands on `system.device`, plus one that does not exist.
const COMMANDS: [&str; 3] = ["reset", "echo", "explode"];

/// One client request.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// `n`
    Noop,
    /// `s,<micros>e-6` or bare `s`
    Step {
        /// Duration in microseconds; zero sends a bare `s`
        micros: u8,
    },
    /// `i[,name]`
    Info {
        /// Index into the known object names
        object: u8,
    },
    /// `e,system.device,<cmd>[,args]`
    Execute {
        /// Index into the known command names
        command: u8,
        /// Free-text argument
        argument: String,
    },
    /// `t`
    Time,
    /// `q`
    Quantum,
    /// `Q,<nanos>e-9`
    SetQuantum {
        /// New quantum in nanoseconds
        nanos: u16,
    },
    /// `a,<name>`
    Read {
        /// Index into the known attribute names
        attribute: u8,
    },
    /// `A,<name>,<value>`
    Write {
        /// Index into the known attribute names
        attribute: u8,
        /// Value to write
        value: u32,
    },
    /// `v`
    Version,
    /// Arbitrary payload, usually garbage
    Raw(String),
}

fn pick<T: Copy, const N: usize>(table: [T; N], index: u8) -> T {
    table[usize::from(index) % N]
}

impl Operation {
    /// Packet payload for this operation.
    pub fn to_payload(&self) -> String {
        match self {
            Self::Noop => "n".to_string(),
            Self::Step { micros: 0 } => "s".to_string(),
            Self::Step { micros } => format!("s,{micros}e-6"),
            Self::Info { object } => match pick(OBJECTS, *object) {
                "" => "i".to_string(),
                name => format!("i,{name}"),
            },
            Self::Execute { command, argument } => format!(
                "e,system.device,{},{}",
                pick(COMMANDS, *command),
                escape(argument, FIELD_DELIMITER)
            ),
            Self::Time => "t".to_string(),
            Self::Quantum => "q".to_string(),
            Self::SetQuantum { nanos } => format!("Q,{nanos}e-9"),
            Self::Read { attribute } => format!("a,{}", pick(ATTRIBUTES, *attribute)),
            Self::Write { attribute, value } => {
                format!("A,{},{value}", pick(ATTRIBUTES, *attribute))
            },
            Self::Version => "v".to_string(),
            Self::Raw(payload) => payload.clone(),
        }
    }
}
