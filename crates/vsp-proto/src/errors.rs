//! Protocol error types.

use thiserror::Error;

/// Errors raised while framing or parsing protocol traffic.
///
/// Every variant is a protocol-level fault: the connection that produced it
/// cannot be trusted to stay in sync and should be closed.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Packet checksum does not match its payload.
    #[error("checksum mismatch: expected {expected:02x}, got {actual:02x}")]
    ChecksumMismatch {
        /// Checksum computed over the received payload
        expected: u8,
        /// Checksum carried by the packet
        actual: u8,
    },

    /// Checksum digits are not hexadecimal.
    #[error("invalid checksum digits {0:?}")]
    InvalidChecksum([u8; 2]),

    /// Packet exceeds the configured maximum payload length.
    #[error("packet too large: {size} bytes (max {max})")]
    PacketTooLarge {
        /// Number of payload bytes seen so far
        size: usize,
        /// Configured limit
        max: usize,
    },

    /// Payload ends with an escape byte that has nothing to escape.
    #[error("dangling escape at end of packet")]
    DanglingEscape,

    /// Raw byte does not name a known interrupt signal.
    #[error("invalid signal received: 0x{0:02x}")]
    UnknownSignal(u8),

    /// Underlying transport failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_mismatch_display() {
        let err = ProtocolError::ChecksumMismatch { expected: 0x6e, actual: 0x00 };
        assert_eq!(err.to_string(), "checksum mismatch: expected 6e, got 00");
    }

    #[test]
    fn unknown_signal_display() {
        assert_eq!(ProtocolError::UnknownSignal(0x7f).to_string(), "invalid signal received: 0x7f");
    }
}
