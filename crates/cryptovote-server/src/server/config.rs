use anyhow::{Context, bail};
use clap::Parser;
use core::{net::SocketAddr, time::Duration};

/// Runtime configuration for the `cryptovote-server` binary.
///
/// Every value can be given as a CLI flag or through the environment (a `.env`
/// file is loaded first).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "cryptovote-server",
    version,
    about = "A gRPC service for crypto vote records with live vote-sum streams"
)]
pub struct CliArgs {
    /// TCP address the gRPC listener binds to, e.g. "0.0.0.0:3333".
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:3333"))]
    pub server_addr: String,

    /// Pending updates each vote-sum subscriber may hold.
    ///
    /// Updates published while a subscriber's buffer is full are dropped for
    /// that subscriber only. Larger values smooth out slow consumers at the
    /// cost of memory per stream.
    ///
    /// Environment variable: `SUBSCRIBER_BUFFER_SIZE`
    #[arg(long, env = "SUBSCRIBER_BUFFER_SIZE", default_value_t = 16)]
    pub subscriber_buffer_size: usize,

    /// Responses buffered between a stream's forward loop and the transport.
    ///
    /// Environment variable: `STREAM_BUFFER_SIZE`
    #[arg(long, env = "STREAM_BUFFER_SIZE", default_value_t = 8)]
    pub stream_buffer_size: usize,

    /// Seconds to wait for live streams to end during shutdown.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 3)]
    pub shutdown_timeout: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: SocketAddr,
    pub subscriber_buffer_size: usize,
    pub stream_buffer_size: usize,
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 3333)),
            subscriber_buffer_size: 16,
            stream_buffer_size: 8,
            shutdown_timeout: Duration::from_secs(3),
        }
    }
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.subscriber_buffer_size == 0 {
            bail!("SUBSCRIBER_BUFFER_SIZE must be greater than 0");
        }

        if args.stream_buffer_size == 0 {
            bail!("STREAM_BUFFER_SIZE must be greater than 0");
        }

        let server_addr = args
            .server_addr
            .parse::<SocketAddr>()
            .with_context(|| {
                format!("SERVER_ADDR {:?} is not a socket address", args.server_addr)
            })?;

        Ok(Self {
            server_addr,
            subscriber_buffer_size: args.subscriber_buffer_size,
            stream_buffer_size: args.stream_buffer_size,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
        })
    }
}
