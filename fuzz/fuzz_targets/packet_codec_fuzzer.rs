//! Fuzz target for [`RspCodec`] framing
//!
//! Arbitrary bytes from an untrusted client must never crash the decoder.
//!
//! # Strategy
//!
//! - Byte streams: raw input split into arbitrary read chunks
//! - Small limits: packet length cap drawn from the input
//!
//! # Invariants
//!
//! - Decoding NEVER panics, whatever the chunk boundaries
//! - Every decoded packet re-encodes, whatever its length, to a packet that
//!   decodes to itself
//! - An error ends decoding (the connection would be closed)

#![no_main]

use arbitrary::Arbitrary;
use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use tokio_util::codec::{Decoder, Encoder};
use vsp_proto::{Frame, RspCodec};

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    max_packet_len: u16,
    chunk_sizes: Vec<u8>,
    bytes: Vec<u8>,
}

fuzz_target!(|input: FuzzInput| {
    let mut codec = RspCodec::new(usize::from(input.max_packet_len).max(1));
    let mut buf = BytesMut::new();
    let mut rest = input.bytes.as_slice();
    let mut chunks = input.chunk_sizes.iter().cycle();

    while !rest.is_empty() {
        let size = chunks.next().map_or(rest.len(), |&n| usize::from(n).max(1)).min(rest.len());
        let (chunk, tail) = rest.split_at(size);
        buf.extend_from_slice(chunk);
        rest = tail;

        loop {
            match codec.decode(&mut buf) {
                Ok(Some(frame)) => check_roundtrip(&mut codec, frame),
                Ok(None) => break,
                Err(_) => return,
            }
        }
    }
});

fn check_roundtrip(codec: &mut RspCodec, frame: Frame) {
    let Frame::Packet(payload) = frame else {
        return;
    };

    let mut wire = BytesMut::new();
    codec
        .encode(Frame::Packet(payload.clone()), &mut wire)
        .expect("outbound packets are unlimited");

    // Lossy UTF-8 replacement can grow a payload past the inbound limit.
    let decoded =
        RspCodec::new(usize::MAX).decode(&mut wire).expect("re-encoded packet must decode");
    assert_eq!(decoded, Some(Frame::Packet(payload)));
    assert!(wire.is_empty());
}
