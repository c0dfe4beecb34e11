//! Server error types.

use std::fmt;

use vsp_core::ControlError;
use vsp_proto::ProtocolError;

/// Errors that can occur in the server.
#[derive(Debug)]
pub enum ServerError {
    /// Another session already owns the slot
    SessionExists,

    /// Configuration error
    Config(String),

    /// Transport/network error
    Transport(String),

    /// Framing or signal fault on the connection
    Protocol(ProtocolError),

    /// Run controller refused a transition
    Control(ControlError),
}

impl ServerError {
    /// Whether the error ends the whole session rather than one connection.
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::SessionExists | Self::Config(_) => true,
            Self::Control(err) => matches!(err, ControlError::Terminated),
            Self::Transport(_) | Self::Protocol(_) => false,
        }
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionExists => write!(f, "session already exists"),
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Protocol(err) => write!(f, "protocol error: {err}"),
            Self::Control(err) => write!(f, "control error: {err}"),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Protocol(err) => Some(err),
            Self::Control(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProtocolError> for ServerError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Io(err) => Self::from(err),
            err => Self::Protocol(err),
        }
    }
}

impl From<ControlError> for ServerError {
    fn from(err: ControlError) -> Self {
        Self::Control(err)
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
