use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method};
use log::*;
use service::{config::Config, logging::Logger, AppState};
use std::net::SocketAddr;
use tower_http::cors::{AllowOrigin, CorsLayer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::new();
    Logger::init_logger(&config);

    info!("Starting up in {} mode...", config.runtime_env);

    let app_state = AppState::new(config.clone());

    // The protocol gateways publish through these senders. The ingest task
    // owns the receiving ends and runs until the senders are dropped at
    // shutdown.
    let (upstream_senders, upstream_receivers) = events::ingest::channels();
    let ingest_task = events::ingest::spawn(app_state.event_router.clone(), upstream_receivers);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-version"),
        ])
        .allow_origin(AllowOrigin::list(
            config
                .allowed_origins
                .iter()
                .filter_map(|origin| origin.parse().ok()),
        ));

    let router = web::router::define_routes(app_state).layer(cors);

    let host = config.interface.as_deref().unwrap_or("127.0.0.1");
    let listen_address = format!("{host}:{}", config.port);
    info!("Server starting... listening for connections on http://{listen_address}");

    let listener = tokio::net::TcpListener::bind(&listen_address).await?;
    // ConnectInfo supplies the peer address the per-IP quota falls back to
    // when no x-forwarded-for header is present.
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    drop(upstream_senders);
    ingest_task.await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install shutdown signal handler: {e}");
    }
    info!("Shutdown signal received, closing open streams");
}
