// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::console_service::ConsoleService;
use crate::application::serial_link::SerialLink;
use crate::application::session::Session;
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::config::load_console_config;
use crate::infrastructure::line_codec::LineCodec;
use crate::infrastructure::system_ports::SystemPorts;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    connect, disconnect, health_check, list_ports, reset_telemetry, send_parameters, status,
    telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_console_config()?;

    // Infrastructure
    let ports = Arc::new(SystemPorts::new(Duration::from_millis(
        config.serial.read_timeout_ms,
    )));
    let codec = LineCodec::new(
        config.protocol.marker.clone(),
        config.protocol.setpoint_offset,
    );

    // Application
    let session = Arc::new(Session::new(Arc::new(SystemClock)));
    let link = Arc::new(SerialLink::new(ports, session.clone(), codec));
    let console = ConsoleService::new(
        link,
        session,
        config.console.reset_on_send,
        config.window.seconds,
    );

    if let Some(port) = config.serial.port.clone() {
        let baud_rate = config.serial.baud_rate;
        let startup = console.clone();
        // Not fatal: the operator can still pick a port over HTTP.
        if let Err(e) = tokio::task::spawn_blocking(move || startup.connect(&port, baud_rate)).await? {
            tracing::warn!("Start-up connect failed: {}", e);
        }
    }

    let state = Arc::new(AppState {
        console: console.clone(),
        default_baud_rate: config.serial.baud_rate,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/ports", get(list_ports))
        .route("/status", get(status))
        .route("/connect", post(connect))
        .route("/disconnect", post(disconnect))
        .route("/parameters", post(send_parameters))
        .route("/telemetry", get(telemetry))
        .route("/telemetry/reset", post(reset_telemetry))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid server.bind address {:?}", config.server.bind))?;
    tracing::info!("Starting levitation console on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tokio::task::spawn_blocking(move || console.disconnect()).await?;
    tracing::info!("Levitation console stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
