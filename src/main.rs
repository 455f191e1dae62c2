/// Space-data gateway: re-exposes NASA APIs under one origin
mod clients;
mod config;
mod domain;
mod errors;
mod handlers;
mod routes;
mod services;

use crate::clients::UpstreamClient;
use crate::config::GatewayConfig;
use crate::domain::RouteTable;
use crate::handlers::AppState;
use crate::routes::build_router;
use crate::services::GatewayService;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    // Load configuration
    let config = GatewayConfig::from_env()?;
    info!(
        "Configuration loaded (credential configured: {}, upstream timeout: {:?})",
        config.credential.is_configured(),
        config.upstream_timeout
    );

    let client = UpstreamClient::new(config.upstream_timeout)?;
    let gateway = GatewayService::new(client, config.upstreams.clone(), config.credential.clone());
    let routes = RouteTable::standard();
    for route in routes.iter() {
        info!("Serving {} at {}", route.name, route.path);
    }

    let state = AppState {
        gateway: Arc::new(gateway),
        routes: Arc::new(routes),
    };

    let app = build_router(state, config.allowed_origin.clone());

    let address = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("space_gateway listening on {}", address);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("space_gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
