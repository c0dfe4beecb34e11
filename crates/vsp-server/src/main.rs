//! vsp demo binary.
//!
//! # Usage
//!
//! ```bash
//! # Run the demo platform for 1 ms of virtual time
//! vsp-server --duration 1e-3
//!
//! # Open a control session on port 4444 and log every packet
//! vsp-server --port 4444 --session-debug
//!
//! # Show the attributes a client can read
//! vsp-server --list-attributes
//! ```

use std::io::{self, Write};

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use vsp_core::{Capabilities, Dispatcher, Kernel, Registry, SimTime, introspect::for_each_object};
use vsp_server::{Server, ServerConfig, SessionSlot, run_standalone};
use vsp_sim::{EventKernel, demo_platform};

/// vsp simulation control server
#[derive(Parser, Debug)]
#[command(name = "vsp-server")]
#[command(about = "Demo simulation with a remote control session")]
#[command(version)]
struct Args {
    /// Open a control session on this port (0 picks one)
    #[arg(short, long)]
    port: Option<u16>,

    /// Simulation quantum in seconds
    #[arg(long, default_value = "1e-6", value_parser = parse_seconds)]
    quantum: SimTime,

    /// Standalone run length in seconds; runs until Ctrl-C when omitted
    #[arg(short, long, value_parser = parse_seconds)]
    duration: Option<SimTime>,

    /// Log every session packet
    #[arg(long)]
    session_debug: bool,

    /// Directory for the session announce file
    #[arg(long)]
    announce_dir: Option<std::path::PathBuf>,

    /// Print every attribute and exit
    #[arg(long)]
    list_attributes: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_seconds(text: &str) -> Result<SimTime, String> {
    SimTime::parse_secs(text).ok_or_else(|| format!("invalid duration '{text}'"))
}

fn list_attributes(registry: &dyn Registry, out: &mut impl Write) -> io::Result<()> {
    let mut result = Ok(());
    for_each_object(registry, &mut |path, node| {
        if result.is_err() || !node.capabilities().contains(Capabilities::ATTRIBUTE_HOLDER) {
            return;
        }
        for attribute in node.attributes() {
            result = writeln!(
                out,
                "{path}.{}: {}<{}>",
                attribute.name(),
                attribute.kind(),
                attribute.type_name()
            );
            if result.is_err() {
                return;
            }
        }
    });
    result
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let mut kernel = EventKernel::new();
    kernel.set_quantum(args.quantum);
    let platform = demo_platform(&mut kernel);

    if args.list_attributes {
        list_attributes(&platform, &mut io::stdout().lock())?;
        return Ok(());
    }

    tracing::info!("{} starting", kernel.version());
    let dispatcher = Dispatcher::new(kernel, platform);

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupted");
                shutdown.cancel();
            }
        }
    });

    if let Some(port) = args.port {
        let mut config =
            ServerConfig { port, echo: args.session_debug, ..ServerConfig::default() };
        if let Some(dir) = args.announce_dir {
            config.announce_dir = dir;
        }

        let server = Server::bind(config, dispatcher, &SessionSlot::process()).await?;
        tracing::info!("Server listening on {}", server.local_addr()?);
        let dispatcher = server.run(shutdown).await?;
        tracing::info!(time = %dispatcher.kernel().now(), "session ended");
    } else {
        let mut dispatcher = dispatcher;
        let outcome = run_standalone(&mut dispatcher, args.duration, &shutdown).await?;
        tracing::debug!(?outcome, "standalone run ended");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_attribute_with_kind_and_type() {
        let mut kernel = EventKernel::new();
        let platform = demo_platform(&mut kernel);

        let mut out = Vec::new();
        list_attributes(&platform, &mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "system.timer.ticks: counter<u64>\n\
             system.timer.period: property<string>\n\
             system.device.reg0: property<u32>\n\
             system.device.regs: property<u16>\n\
             system.device.status: property<string>\n"
        );
    }

    #[test]
    fn seconds_arguments_parse_to_sim_time() {
        assert_eq!(parse_seconds("1e-6"), Ok(SimTime::from_us(1)));
        assert!(parse_seconds("soon").is_err());
    }
}
