//! Fixed reply packets.

/// Unconditional success.
pub const OK: &str = "OK";

/// Prefix of a failed command invocation reply.
pub const ERROR: &str = "ERROR";

/// Sent when the simulation stopped on user request during a run.
pub const STOP: &str = "STOP";

/// Sent when the simulation hit an internal error during a run.
pub const ERR_INTERNAL: &str = "E03";
