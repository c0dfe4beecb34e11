//! Test client and dispatcher fixtures for session tests.

#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use vsp_core::{CommandOutput, Dispatcher};
use vsp_proto::{Frame, RspCodec};
use vsp_sim::{Component, EventKernel, Platform, Property, demo_platform};

/// Length of the `dump` command output, above the default packet limit.
pub const LARGE_OUTPUT: usize = 70_000;

pub type TestDispatcher = Dispatcher<EventKernel, Platform>;

/// Dispatcher over the demo platform with its periodic timer.
pub fn demo() -> TestDispatcher {
    let mut kernel = EventKernel::new();
    let platform = demo_platform(&mut kernel);
    Dispatcher::new(kernel, platform)
}

/// Dispatcher over a single `device` with no scheduled activity.
pub fn quiet() -> TestDispatcher {
    let device = Component::new("device", "device")
        .with_attribute(Property::unsigned("reg0", 7, 4))
        .with_command("ping", 0, "answer pong", |_| Ok(CommandOutput::ok("pong")))
        .with_command("dump", 0, "print a large buffer", |_| {
            Ok(CommandOutput::ok("A".repeat(LARGE_OUTPUT)))
        });
    Dispatcher::new(EventKernel::new(), Platform::new().with(device))
}

/// RSP client speaking to the server under test.
pub struct Client<S> {
    framed: Framed<S, RspCodec>,
    acks: usize,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Client<S> {
    pub fn new(stream: S) -> Self {
        Self { framed: Framed::new(stream, RspCodec::default()), acks: 0 }
    }

    /// Accept replies of any length.
    pub fn accept_large_packets(&mut self) {
        *self.framed.codec_mut() = RspCodec::new(usize::MAX);
    }

    pub async fn send(&mut self, payload: &str) {
        self.framed.send(Frame::Packet(payload.to_string())).await.unwrap();
    }

    pub async fn signal(&mut self, byte: u8) {
        self.framed.send(Frame::Signal(byte)).await.unwrap();
    }

    /// Send a packet and a signal byte in a single write, so the server sees
    /// the signal before the run executes its first unit.
    pub async fn send_then_signal(&mut self, payload: &str, byte: u8) {
        self.framed.feed(Frame::Packet(payload.to_string())).await.unwrap();
        self.framed.feed(Frame::Signal(byte)).await.unwrap();
        self.framed.flush().await.unwrap();
    }

    /// Send two packets in a single write.
    pub async fn send_pair(&mut self, first: &str, second: &str) {
        self.framed.feed(Frame::Packet(first.to_string())).await.unwrap();
        self.framed.feed(Frame::Packet(second.to_string())).await.unwrap();
        self.framed.flush().await.unwrap();
    }

    /// Next raw frame; `None` once closed.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        self.framed.next().await.map(Result::unwrap)
    }

    /// Next packet payload, counting acks on the way; `None` once closed.
    pub async fn recv(&mut self) -> Option<String> {
        loop {
            match self.framed.next().await? {
                Ok(Frame::Packet(payload)) => return Some(payload),
                Ok(Frame::Ack) => self.acks += 1,
                Ok(frame) => panic!("unexpected frame {frame:?}"),
                Err(err) => panic!("client decode error: {err}"),
            }
        }
    }

    pub async fn request(&mut self, payload: &str) -> String {
        self.send(payload).await;
        self.recv().await.unwrap_or_else(|| panic!("connection closed awaiting {payload}"))
    }

    pub const fn acks(&self) -> usize {
        self.acks
    }

    /// Underlying stream, for writing raw bytes.
    pub fn stream_mut(&mut self) -> &mut S {
        self.framed.get_mut()
    }
}
