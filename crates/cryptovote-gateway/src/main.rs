use clap::Parser;
use cryptovote_core::proto::upvote_system_client::UpvoteSystemClient;
use cryptovote_gateway::gateway::{
    config::{CliArgs, GatewayConfig},
    router,
    telemetry::init_telemetry,
};
use tokio::{net::TcpListener, signal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = GatewayConfig::try_from(args)?;

    init_telemetry()?;

    let client = UpvoteSystemClient::new(config.upstream_channel()?);
    let listener = TcpListener::bind(&config.gateway_addr).await?;
    tracing::info!(
        "Gateway listening on {} (upstream {})",
        config.gateway_addr,
        config.upstream_url
    );

    axum::serve(listener, router(client))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Gateway shut down successfully");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }
}
