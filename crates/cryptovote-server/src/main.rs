use clap::Parser;
use cryptovote_core::proto::{FILE_DESCRIPTOR_SET, upvote_system_server::UpvoteSystemServer};
use cryptovote_server::server::{
    config::{CliArgs, ServerConfig},
    service::{CryptoService, build_crypto_service},
    store::MemoryStore,
    telemetry::{TelemetryProviders, init_telemetry},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tonic_health::server::HealthReporter;
use tonic_reflection::server::Builder;
use tonic_web::GrpcWebLayer;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let config = ServerConfig::try_from(CliArgs::parse())?;

    let providers = init_telemetry()?;

    let listener = TcpListener::bind(config.server_addr).await?;
    log_startup_info(&config);

    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<UpvoteSystemServer<CryptoService>>()
        .await;

    let reflection = Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()?;

    let service = CryptoService::new(config, Arc::new(MemoryStore::new()));

    // Browsers reach the service through gRPC-Web, hence HTTP/1 and CORS.
    let web = ServiceBuilder::new()
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(GrpcWebLayer::new());

    Server::builder()
        .accept_http1(true)
        .http2_adaptive_window(Some(true))
        .layer(web)
        .add_service(health_service)
        .add_service(reflection)
        .add_service(build_crypto_service(service.clone()))
        .serve_with_incoming_shutdown(
            TcpListenerStream::new(listener),
            shutdown_signal(service, health_reporter, providers),
        )
        .await?;

    tracing::info!("Vote service stopped");
    Ok(())
}

fn log_startup_info(config: &ServerConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Vote service listening on {}: {config:#?}", config.server_addr);
    } else {
        tracing::info!(
            addr = %config.server_addr,
            subscriber_buffer = config.subscriber_buffer_size,
            stream_buffer = config.stream_buffer_size,
            "Vote service listening"
        );
    }
}

async fn shutdown_signal(
    service: CryptoService,
    health_reporter: HealthReporter,
    providers: TelemetryProviders,
) {
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

    tracing::info!("Shutdown signal received, terminating gracefully...");

    // 1. Publish the status
    health_reporter
        .set_not_serving::<UpvoteSystemServer<CryptoService>>()
        .await;

    // 2. Refuse new calls and end live streams
    if let Err(e) = service.shutdown().await {
        tracing::error!("Error during service shutdown: {e:?}");
    }

    // 3. Flush exporters
    providers.shutdown();
}
