//! vsp session server.
//!
//! This crate puts a [`Dispatcher`] on the network:
//! - Tokio TCP listener, one client at a time
//! - RSP framing through `tokio_util::codec`
//! - Announce file so clients can discover the session
//!
//! ## Architecture
//!
//! ```text
//! vsp-server
//!   ├─ SessionSlot       (one session per process)
//!   ├─ Announce          (discovery file, removed on exit)
//!   ├─ Server            (accept loop)
//!   ├─ serve_connection  (packets, signals, interruptible runs)
//!   └─ run_standalone    (no session, fixed duration)
//! ```
//!
//! The dispatcher, kernel and object tree live on the task that runs the
//! server; nothing here spawns or shares them across threads.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod announce;
mod connection;
mod error;
mod session;
mod standalone;

use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
};

pub use announce::{Announce, FILE_PREFIX};
pub use connection::{ConnectionEnd, ConnectionOptions, serve_connection};
pub use error::ServerError;
pub use session::{SessionGuard, SessionSlot};
pub use standalone::run_standalone;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use vsp_core::{Dispatcher, Kernel, Registry, RunState};
use vsp_proto::DEFAULT_MAX_PACKET_LEN;

/// Session server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on
    pub bind_address: IpAddr,
    /// TCP port; 0 picks an ephemeral one
    pub port: u16,
    /// Directory receiving the announce file
    pub announce_dir: PathBuf,
    /// Log every packet at info level
    pub echo: bool,
    /// Largest accepted packet payload
    pub max_packet_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            announce_dir: env::temp_dir(),
            echo: false,
            max_packet_len: DEFAULT_MAX_PACKET_LEN,
        }
    }
}

/// Control session listening for clients.
pub struct Server<K, R> {
    listener: TcpListener,
    dispatcher: Dispatcher<K, R>,
    options: ConnectionOptions,
    announce: Announce,
    _session: SessionGuard,
}

impl<K: Kernel, R: Registry> Server<K, R> {
    /// Claim the session slot, bind, settle the kernel and announce the port.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `config.max_packet_len` is zero
    /// - `slot` is already held by another session
    /// - Binding to the address fails
    /// - The announce file cannot be written
    pub async fn bind(
        config: ServerConfig,
        mut dispatcher: Dispatcher<K, R>,
        slot: &SessionSlot,
    ) -> Result<Self, ServerError> {
        if config.max_packet_len == 0 {
            return Err(ServerError::Config("max packet length must be positive".to_string()));
        }
        let session = slot.claim()?;
        let listener = TcpListener::bind((config.bind_address, config.port)).await?;
        let port = listener.local_addr()?.port();

        dispatcher.settle()?;
        let announce = Announce::create(&config.announce_dir, port)?;
        info!(port, announce = %announce.path().display(), "session listening");

        let options = ConnectionOptions {
            echo: config.echo,
            max_packet_len: config.max_packet_len,
            ..ConnectionOptions::default()
        };
        Ok(Self { listener, dispatcher, options, announce, _session: session })
    }

    /// Get the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Location of the announce file.
    pub fn announce_path(&self) -> &Path {
        self.announce.path()
    }

    /// Serve clients one after another until the session ends.
    ///
    /// The session ends on quit, a stop signal, a terminal kernel status or
    /// cancellation of `shutdown`. Returns the dispatcher so the caller can
    /// inspect the final simulation state.
    ///
    /// # Errors
    ///
    /// Returns error if the run controller refuses a transition; connection
    /// faults are logged and the server keeps listening.
    pub async fn run(
        mut self,
        shutdown: CancellationToken,
    ) -> Result<Dispatcher<K, R>, ServerError> {
        loop {
            let accepted = tokio::select! {
                biased;
                () = shutdown.cancelled() => {
                    info!("shutdown requested");
                    self.dispatcher.quit()?;
                    break;
                }
                accepted = self.listener.accept() => accepted,
            };

            let (stream, peer) = match accepted {
                Ok(accepted) => accepted,
                Err(err) => {
                    error!(%err, "accept error");
                    continue;
                },
            };
            info!(%peer, "client connected");
            if let Err(err) = stream.set_nodelay(true) {
                error!(%peer, %err, "failed to disable nagle");
            }

            match serve_connection(stream, &mut self.dispatcher, &self.options, &shutdown).await {
                Ok(ConnectionEnd::Disconnected) => info!(%peer, "client disconnected"),
                Ok(ConnectionEnd::Terminated) => info!(%peer, "session terminated"),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => error!(%peer, %err, "connection closed"),
            }

            if self.dispatcher.state() == RunState::Terminated {
                break;
            }
        }

        self.announce.cleanup();
        info!("session closed");
        Ok(self.dispatcher)
    }
}
