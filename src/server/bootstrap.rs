use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::middleware;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::room::{InMemoryRoomStorage, RoomRegistry, RoomService, RoomStorage};

use super::logging::log_requests;
use super::routes::PartyRoomsServer;

const LOG_TARGET: &str = "server::bootstrap";

pub struct ServerConfig {
    pub bind: SocketAddr,
}

pub async fn run_server(config: ServerConfig) -> Result<()> {
    let storage: Arc<dyn RoomStorage> = Arc::new(InMemoryRoomStorage::new());
    let registry = Arc::new(RoomRegistry::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let service = Arc::new(RoomService::new(storage, registry, clock));

    let server = PartyRoomsServer::new(service);
    let router = server
        .into_router()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .layer(middleware::from_fn(log_requests));
    let make_service = router.into_make_service();

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    let local_addr = listener.local_addr()?;
    info!(
        target = LOG_TARGET,
        %local_addr,
        "party rooms server listening"
    );

    axum::serve(listener, make_service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited with error")
}

async fn shutdown_signal() {
    use tracing::warn;

    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(
            target = LOG_TARGET,
            error = %err,
            "failed to install ctrl-c handler"
        );
    }
    info!(target = LOG_TARGET, "shutdown signal received");
}
