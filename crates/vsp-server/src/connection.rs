//! One client connection.
//!
//! ## Architecture
//!
//! ```text
//! stream ─► Framed<RspCodec> ─► Frame ─► Dispatcher::handle_packet
//!                                            │
//!                    Reply / Quit ◄──────────┤
//!                                            ▼ Run
//!                                      run loop: select! {
//!                                          shutdown token,
//!                                          next inbound frame,
//!                                          yield ─► Dispatcher::run_unit
//!                                      }
//! ```
//!
//! While idle, packets are handled one at a time and raw signal bytes are
//! ignored. During a run the loop races the next inbound frame against the
//! next kernel unit; the scheduler gets a yield between units so signals are
//! seen while the simulation is busy.
//!
//! # Invariants
//!
//! - A run ends with exactly one reply, unless the connection was lost.
//! - A lost connection during a run pauses the kernel before the run ends.

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::{codec::Framed, sync::CancellationToken};
use tracing::{debug, error, info, warn};
use vsp_core::{
    Dispatcher, Kernel, Progress, Registry, Response, RunOutcome, RunRequest, SignalResponse,
};
use vsp_proto::{DEFAULT_MAX_PACKET_LEN, Frame, ProtocolError, RspCodec, Signal, reply};

use crate::ServerError;

/// Per-connection protocol options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// Acknowledge every valid packet with `+`
    pub ack: bool,
    /// Log every packet in and out at info level
    pub echo: bool,
    /// Largest accepted packet payload
    pub max_packet_len: usize,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self { ack: true, echo: false, max_packet_len: DEFAULT_MAX_PACKET_LEN }
    }
}

/// How a served connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEnd {
    /// The client went away; the session keeps listening.
    Disconnected,
    /// The session is over: quit, stop signal, terminal kernel status or
    /// shutdown.
    Terminated,
}

enum RunEvent {
    Shutdown,
    Inbound(Option<Result<Frame, ProtocolError>>),
    Unit,
}

struct Link<'a, S> {
    framed: Framed<S, RspCodec>,
    options: &'a ConnectionOptions,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Link<'_, S> {
    async fn send(&mut self, payload: String) -> Result<(), ProtocolError> {
        if self.options.echo {
            info!(packet = %payload, "send");
        }
        self.framed.send(Frame::Packet(payload)).await
    }

    /// Send during a run; a failed write counts as a lost connection.
    async fn try_send(&mut self, payload: String) -> bool {
        match self.send(payload).await {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, "failed to send during run");
                false
            },
        }
    }
}

/// Serve one client until it disconnects or the session ends.
///
/// # Errors
///
/// Returns [`ServerError::Protocol`] for framing faults and unknown signals
/// while idle, and [`ServerError::Transport`] for I/O failures. Both end only
/// this connection.
pub async fn serve_connection<S, K, R>(
    stream: S,
    dispatcher: &mut Dispatcher<K, R>,
    options: &ConnectionOptions,
    shutdown: &CancellationToken,
) -> Result<ConnectionEnd, ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    K: Kernel,
    R: Registry,
{
    let framed = Framed::new(stream, RspCodec::new(options.max_packet_len));
    let mut link = Link { framed, options };

    loop {
        let inbound = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                info!("shutdown requested");
                dispatcher.quit()?;
                return Ok(ConnectionEnd::Terminated);
            }
            inbound = link.framed.next() => inbound,
        };

        let payload = match inbound {
            None => return Ok(ConnectionEnd::Disconnected),
            Some(Err(err)) => {
                error!(%err, "protocol error");
                return Err(err.into());
            },
            Some(Ok(Frame::Packet(payload))) => payload,
            Some(Ok(Frame::Ack | Frame::Nak)) => continue,
            Some(Ok(Frame::Signal(byte))) => match Signal::try_from(byte) {
                Ok(signal) => {
                    debug!(?signal, "ignoring signal outside a run");
                    continue;
                },
                Err(err) => {
                    error!(%err, "unknown signal while idle");
                    return Err(err.into());
                },
            },
        };

        if options.ack {
            link.framed.send(Frame::Ack).await?;
        }
        if options.echo {
            info!(packet = %payload, "recv");
        } else {
            debug!(packet = %payload, "recv");
        }

        match dispatcher.handle_packet(&payload) {
            Response::Reply(text) => link.send(text).await?,
            Response::Quit(text) => {
                link.send(text).await?;
                return Ok(ConnectionEnd::Terminated);
            },
            Response::Run(request) => {
                if let Some(end) = run(&mut link, dispatcher, request, shutdown).await? {
                    return Ok(end);
                }
            },
        }
    }
}

/// Drive one run to completion; `Some` ends the connection.
async fn run<S, K, R>(
    link: &mut Link<'_, S>,
    dispatcher: &mut Dispatcher<K, R>,
    request: RunRequest,
    shutdown: &CancellationToken,
) -> Result<Option<ConnectionEnd>, ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    K: Kernel,
    R: Registry,
{
    dispatcher.begin_run(request)?;
    debug!(duration = %request.duration(), "run started");

    let mut connected = true;
    let mut stopping = false;

    loop {
        let event = tokio::select! {
            biased;
            () = shutdown.cancelled(), if !stopping => RunEvent::Shutdown,
            inbound = link.framed.next(), if connected => RunEvent::Inbound(inbound),
            () = tokio::task::yield_now() => RunEvent::Unit,
        };

        match event {
            RunEvent::Shutdown => {
                info!("shutdown requested during run");
                stopping = true;
                dispatcher.interrupt(Signal::Terminate)?;
            },
            RunEvent::Unit => {
                if dispatcher.run_unit()? == Progress::Settled {
                    break;
                }
            },
            RunEvent::Inbound(None) => {
                info!("client disconnected during run");
                connected = false;
                dispatcher.interrupt(Signal::Pause)?;
            },
            RunEvent::Inbound(Some(Err(err))) => {
                error!(%err, "protocol error during run");
                connected = false;
                dispatcher.interrupt(Signal::Pause)?;
            },
            RunEvent::Inbound(Some(Ok(Frame::Ack | Frame::Nak))) => {},
            RunEvent::Inbound(Some(Ok(Frame::Packet(payload)))) => {
                error!(packet = %payload, "packet received during run");
                abandon(link, dispatcher).await?;
                connected = false;
            },
            RunEvent::Inbound(Some(Ok(Frame::Signal(byte)))) => {
                match dispatcher.signal(byte) {
                    Ok(SignalResponse::Continue) => debug!(byte, "signal"),
                    Ok(SignalResponse::Reply(text)) => {
                        if !link.try_send(text).await {
                            connected = false;
                            dispatcher.interrupt(Signal::Pause)?;
                        }
                    },
                    Err(err) if err.is_fatal() => {
                        error!(%err, "fatal signal during run");
                        abandon(link, dispatcher).await?;
                        connected = false;
                    },
                    Err(err) => return Err(err.into()),
                }
            },
        }
    }

    match dispatcher.finish_run(connected)? {
        RunOutcome::Reply(text) => {
            if !connected {
                return Ok(Some(ConnectionEnd::Disconnected));
            }
            link.send(text).await?;
            Ok(None)
        },
        RunOutcome::Terminate { packet } => {
            if connected {
                link.try_send(packet.to_string()).await;
            }
            Ok(Some(ConnectionEnd::Terminated))
        },
    }
}

/// Report an internal error, pause the kernel and drop the client.
async fn abandon<S, K, R>(
    link: &mut Link<'_, S>,
    dispatcher: &mut Dispatcher<K, R>,
) -> Result<(), ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    K: Kernel,
    R: Registry,
{
    link.try_send(reply::ERR_INTERNAL.to_string()).await;
    dispatcher.interrupt(Signal::Pause)?;
    Ok(())
}
