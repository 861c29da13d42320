use anyhow::{Context, bail};
use clap::Parser;
use core::time::Duration;
use tonic::transport::{Channel, Endpoint};

/// Runtime configuration for the `cryptovote-gateway` binary.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "cryptovote-gateway",
    version,
    about = "HTTP/JSON gateway for the cryptovote gRPC service"
)]
pub struct CliArgs {
    /// Address the HTTP listener binds to.
    ///
    /// Environment variable: `GATEWAY_ADDR`
    #[arg(long, env = "GATEWAY_ADDR", default_value_t = String::from("0.0.0.0:8000"))]
    pub gateway_addr: String,

    /// URL of the gRPC server every request is forwarded to.
    ///
    /// Environment variable: `UPSTREAM_URL`
    #[arg(long, env = "UPSTREAM_URL", default_value_t = String::from("http://127.0.0.1:3333"))]
    pub upstream_url: String,

    /// Seconds allowed for establishing the upstream connection.
    ///
    /// Environment variable: `UPSTREAM_CONNECT_TIMEOUT`
    #[arg(long, env = "UPSTREAM_CONNECT_TIMEOUT", default_value_t = 5)]
    pub upstream_connect_timeout: u64,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub gateway_addr: String,
    pub upstream_url: String,
    pub upstream_connect_timeout: Duration,
}

impl GatewayConfig {
    /// A lazily connected channel to the upstream gRPC server.
    ///
    /// The first request triggers the connection, so the gateway can start
    /// before the server does.
    pub fn upstream_channel(&self) -> anyhow::Result<Channel> {
        let endpoint = Endpoint::from_shared(self.upstream_url.clone())
            .with_context(|| format!("invalid UPSTREAM_URL {:?}", self.upstream_url))?
            .connect_timeout(self.upstream_connect_timeout);
        Ok(endpoint.connect_lazy())
    }
}

impl TryFrom<CliArgs> for GatewayConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if !(args.upstream_url.starts_with("http://") || args.upstream_url.starts_with("https://"))
        {
            bail!("UPSTREAM_URL must start with http:// or https://");
        }

        if args.upstream_connect_timeout == 0 {
            bail!("UPSTREAM_CONNECT_TIMEOUT must be greater than 0");
        }

        Ok(Self {
            gateway_addr: args.gateway_addr,
            upstream_url: args.upstream_url,
            upstream_connect_timeout: Duration::from_secs(args.upstream_connect_timeout),
        })
    }
}
