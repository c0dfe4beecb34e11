//! Control-state errors.

use thiserror::Error;

/// Errors raised by the run controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    /// A run was requested while one is in progress
    #[error("a run is already in progress")]
    AlreadyRunning,

    /// A run operation was invoked while idle
    #[error("no run in progress")]
    NotRunning,

    /// The session has been terminated
    #[error("session terminated")]
    Terminated,

    /// Out-of-band byte that is not a known signal
    #[error("invalid signal received: 0x{0:02x}")]
    UnknownSignal(u8),
}

impl ControlError {
    /// Whether the error ends the session rather than a single exchange.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Terminated | Self::UnknownSignal(_))
    }
}
