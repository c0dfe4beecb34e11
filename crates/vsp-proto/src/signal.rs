//! Out-of-band interrupt signals.
//!
//! While a run is in progress the client may send a single raw byte outside
//! of any packet. Each signal has a control-byte and a printable alias.

use crate::errors::ProtocolError;

/// Interrupt delivered during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Stop the simulation and end the session (`0x00` or `x`)
    Terminate,
    /// Pause after the current unit of work (`0x03` or `a`)
    Pause,
    /// Report the current time without stopping (`0x42` or `u`)
    TimeUpdate,
}

impl Signal {
    /// Decode a raw signal byte.
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 | b'x' => Some(Self::Terminate),
            0x03 | b'a' => Some(Self::Pause),
            0x42 | b'u' => Some(Self::TimeUpdate),
            _ => None,
        }
    }
}

impl TryFrom<u8> for Signal {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self, ProtocolError> {
        Self::from_byte(byte).ok_or(ProtocolError::UnknownSignal(byte))
    }
}
