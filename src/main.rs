mod models;
mod handlers;
mod routes;
mod docs;
mod websocket;
mod config;
mod utils;
mod ws;

use config::Config;
use routes::create_app_routes;
use std::net::SocketAddr;
use std::panic;
use tracing::{info, error, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use ws::wscolab::ColabHub;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub hub: ColabHub,
    pub default_room: String,
}

#[tokio::main]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Load configuration before tracing so the log level can shape the filter
    let (config, load_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    let config = config::init_config(config);

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_filter().into()))
        .init();

    info!("Starting server...");
    match load_error {
        None => info!("✅ Configuration loaded successfully"),
        Some(e) => {
            error!("❌ Failed to load configuration: {}", e);
            warn!("Using default configuration");
        }
    }

    let state = AppState {
        hub: ColabHub::new(config.cleanup_delay()),
        default_room: config.default_room.clone(),
    };
    let app_routes = create_app_routes(state, config);

    let listener = match tokio::net::TcpListener::bind(config.server_address()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", config.server_address(), e);
            std::process::exit(1);
        }
    };

    info!("📡 WebSocket server running on ws://{}", config.server_address());
    info!("📚 Swagger UI available at http://{}/swagger", config.server_address());
    info!("Documents are kept in memory; empty rooms are removed after {} seconds", config.cleanup_delay().as_secs());

    let served = axum::serve(
        listener,
        app_routes.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    match served {
        Ok(()) => info!("WebSocket server closed"),
        Err(e) => {
            error!("Server error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install SIGINT handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down WebSocket server..."),
        _ = terminate => info!("Received SIGTERM, shutting down WebSocket server..."),
    }
}
