//! RSP-style framing.
//!
//! ```text
//! packet   = '$' payload '#' hex hex      checksum = sum(payload) mod 256
//! ack      = '+'
//! nak      = '-'
//! signal   = any other byte outside a packet
//! ```
//!
//! Inside a payload the bytes `$`, `#`, `}` and `*` are sent as `}` followed
//! by the byte XOR `0x20`. The checksum covers the bytes as they appear on
//! the wire (after escaping).

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::errors::ProtocolError;

/// Default upper bound on the wire length of a single packet payload.
pub const DEFAULT_MAX_PACKET_LEN: usize = 64 * 1024;

const PACKET_START: u8 = b'$';
const PACKET_END: u8 = b'#';
const ESCAPE_BYTE: u8 = b'}';
const ESCAPE_XOR: u8 = 0x20;
const ACK: u8 = b'+';
const NAK: u8 = b'-';

/// One unit of traffic on a control connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Framed command or reply text
    Packet(String),
    /// Raw out-of-band byte
    Signal(u8),
    /// Positive acknowledgement of the last packet
    Ack,
    /// Negative acknowledgement of the last packet
    Nak,
}

/// Encoder/decoder for [`Frame`]s, usable on both ends of a connection.
#[derive(Debug, Clone, Copy)]
pub struct RspCodec {
    max_packet_len: usize,
}

impl RspCodec {
    /// Create a codec that rejects inbound packets longer than
    /// `max_packet_len` wire bytes. Outbound packets are not limited.
    pub const fn new(max_packet_len: usize) -> Self {
        Self { max_packet_len }
    }

    fn decode_packet(&self, src: &mut BytesMut) -> Result<Option<Frame>, ProtocolError> {
        let Some(end) = src.iter().skip(1).position(|&b| b == PACKET_END).map(|pos| pos + 1)
        else {
            let size = src.len() - 1;
            if size > self.max_packet_len {
                return Err(ProtocolError::PacketTooLarge { size, max: self.max_packet_len });
            }
            return Ok(None);
        };

        if end - 1 > self.max_packet_len {
            return Err(ProtocolError::PacketTooLarge { size: end - 1, max: self.max_packet_len });
        }

        // '#' plus two checksum digits
        if src.len() < end + 3 {
            return Ok(None);
        }

        let digits = [src[end + 1], src[end + 2]];
        let actual = parse_checksum(digits)?;
        let wire = &src[1..end];
        let expected = checksum(wire);
        if expected != actual {
            return Err(ProtocolError::ChecksumMismatch { expected, actual });
        }

        let payload = unescape_payload(wire)?;
        src.advance(end + 3);
        Ok(Some(Frame::Packet(String::from_utf8_lossy(&payload).into_owned())))
    }
}

impl Default for RspCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PACKET_LEN)
    }
}

impl Decoder for RspCodec {
    type Item = Frame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, ProtocolError> {
        let Some(&first) = src.first() else {
            return Ok(None);
        };

        match first {
            PACKET_START => self.decode_packet(src),
            ACK => {
                src.advance(1);
                Ok(Some(Frame::Ack))
            },
            NAK => {
                src.advance(1);
                Ok(Some(Frame::Nak))
            },
            byte => {
                src.advance(1);
                Ok(Some(Frame::Signal(byte)))
            },
        }
    }
}

impl Encoder<Frame> for RspCodec {
    type Error = ProtocolError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        match frame {
            Frame::Packet(payload) => {
                let wire = escape_payload(payload.as_bytes());

                dst.reserve(wire.len() + 4);
                dst.put_u8(PACKET_START);
                dst.put_slice(&wire);
                dst.put_u8(PACKET_END);
                dst.put_slice(format!("{:02x}", checksum(&wire)).as_bytes());
            },
            Frame::Signal(byte) => dst.put_u8(byte),
            Frame::Ack => dst.put_u8(ACK),
            Frame::Nak => dst.put_u8(NAK),
        }
        Ok(())
    }
}

fn checksum(wire: &[u8]) -> u8 {
    wire.iter().fold(0u8, |sum, &b| sum.wrapping_add(b))
}

fn parse_checksum(digits: [u8; 2]) -> Result<u8, ProtocolError> {
    let hex = |d: u8| char::from(d).to_digit(16);
    match (hex(digits[0]), hex(digits[1])) {
        (Some(hi), Some(lo)) => Ok(((hi << 4) | lo) as u8),
        _ => Err(ProtocolError::InvalidChecksum(digits)),
    }
}

const fn needs_escape(byte: u8) -> bool {
    matches!(byte, PACKET_START | PACKET_END | ESCAPE_BYTE | b'*')
}

fn escape_payload(payload: &[u8]) -> Vec<u8> {
    let mut wire = Vec::with_capacity(payload.len());
    for &b in payload {
        if needs_escape(b) {
            wire.push(ESCAPE_BYTE);
            wire.push(b ^ ESCAPE_XOR);
        } else {
            wire.push(b);
        }
    }
    wire
}

fn unescape_payload(wire: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let mut payload = Vec::with_capacity(wire.len());
    let mut bytes = wire.iter();
    while let Some(&b) = bytes.next() {
        if b == ESCAPE_BYTE {
            let &escaped = bytes.next().ok_or(ProtocolError::DanglingEscape)?;
            payload.push(escaped ^ ESCAPE_XOR);
        } else {
            payload.push(b);
        }
    }
    Ok(payload)
}
