//! Bingo Controller
//!
//! Stateful WebSocket server coordinating one bingo session.
//!
//! # Servers
//!
//! - WebSocket server for clients (default: 0.0.0.0:5000, path `/ws`)
//! - HTTP server for health and metrics (default: 0.0.0.0:8081)
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment
//! 2. Initialize tracing (pretty or JSON)
//! 3. Initialize Prometheus metrics recorder
//! 4. Spawn the `SessionActor`
//! 5. Start health HTTP server (liveness, readiness, metrics)
//! 6. Bind and start the WebSocket server, then mark ready
//! 7. Wait for shutdown signal

#![warn(clippy::pedantic)]
#![allow(clippy::too_many_lines)] // main.rs orchestrates startup, naturally longer

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use bingo_controller::actors::{ActorMetrics, SessionActor};
use bingo_controller::config::Config;
use bingo_controller::errors::BcError;
use bingo_controller::game::Session;
use bingo_controller::observability::{health_router, init_metrics_recorder, HealthState};
use bingo_controller::transport::ws_router;
use common::config::LogFormat;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Configuration is read before tracing so the log format can be chosen.
    let config = Config::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {e}");
        BcError::Config(e.to_string())
    })?;

    init_tracing(config.observability.log_format);

    info!("Starting Bingo Controller");
    info!(
        ws_bind_address = %config.ws_bind_address,
        health_bind_address = %config.health_bind_address,
        pool_min = config.pool_range.min(),
        pool_max = config.pool_range.max(),
        claim_policy = %config.claim_policy,
        session_mailbox_size = config.session_mailbox_size,
        "Configuration loaded successfully"
    );

    let prometheus_handle = init_metrics_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        BcError::Internal(e)
    })?;
    info!("Prometheus metrics recorder initialized");

    // Session actor owns all game state
    let root_token = CancellationToken::new();
    let actor_metrics = ActorMetrics::new();
    let (session_handle, session_task) = SessionActor::spawn(
        Session::new(config.session_config()),
        config.session_mailbox_size,
        root_token.child_token(),
        Arc::clone(&actor_metrics),
    );
    info!("Session actor started");

    // Readiness drops as soon as the session actor stops, for any reason.
    let health_state = Arc::new(HealthState::new(session_handle.child_token()));

    // Servers stop before the session so no new connections race shutdown.
    let shutdown_token = root_token.child_token();

    // Health server (MUST succeed - fail startup if it doesn't)
    let health_addr: SocketAddr = config.health_bind_address.parse().map_err(|e| {
        error!(error = %e, addr = %config.health_bind_address, "Invalid health bind address");
        BcError::Config(format!("Invalid health bind address: {e}"))
    })?;

    let metrics_router = Router::new().route(
        "/metrics",
        axum::routing::get(move || {
            let handle = prometheus_handle.clone();
            async move { handle.render() }
        }),
    );
    let health_app = health_router(Arc::clone(&health_state)).merge(metrics_router);

    // Bind listener BEFORE spawning to fail fast on bind errors
    let health_listener = tokio::net::TcpListener::bind(health_addr)
        .await
        .map_err(|e| {
            error!(error = %e, addr = %health_addr, "Failed to bind health server");
            BcError::Transport(format!("Failed to bind health server to {health_addr}: {e}"))
        })?;

    let health_shutdown_token = shutdown_token.child_token();
    let health_server = tokio::spawn(async move {
        info!(addr = %health_addr, "Health server starting");
        let server = axum::serve(health_listener, health_app).with_graceful_shutdown(async move {
            health_shutdown_token.cancelled().await;
            info!("Health server shutting down");
        });
        if let Err(e) = server.await {
            error!(error = %e, "Health server failed");
        }
    });

    // WebSocket server
    let ws_addr: SocketAddr = config.ws_bind_address.parse().map_err(|e| {
        error!(error = %e, addr = %config.ws_bind_address, "Invalid WebSocket bind address");
        BcError::Config(format!("Invalid WebSocket bind address: {e}"))
    })?;

    let ws_app = ws_router(session_handle.clone()).layer(TraceLayer::new_for_http());

    let ws_listener = tokio::net::TcpListener::bind(ws_addr).await.map_err(|e| {
        error!(error = %e, addr = %ws_addr, "Failed to bind WebSocket server");
        BcError::Transport(format!("Failed to bind WebSocket server to {ws_addr}: {e}"))
    })?;

    let ws_shutdown_token = shutdown_token.child_token();
    let ws_server = tokio::spawn(async move {
        info!(addr = %ws_addr, "WebSocket server starting");
        let server = axum::serve(ws_listener, ws_app).with_graceful_shutdown(async move {
            ws_shutdown_token.cancelled().await;
            info!("WebSocket server shutting down");
        });
        if let Err(e) = server.await {
            error!(error = %e, "WebSocket server failed");
        }
    });

    health_state.set_ready();
    info!("Bingo Controller running - press Ctrl+C to shutdown");

    shutdown_signal().await;
    info!("Shutdown signal received, initiating graceful shutdown...");

    // Mark as not ready immediately so load balancers stop sending traffic
    health_state.set_not_ready();

    // Cancelling the session closes every client socket, which lets the
    // WebSocket server's graceful shutdown complete.
    session_handle.cancel();
    shutdown_token.cancel();

    let deadline = Duration::from_secs(config.shutdown_timeout_seconds);
    let drained = tokio::time::timeout(deadline, async {
        let _ = session_task.await;
        let _ = ws_server.await;
        let _ = health_server.await;
    })
    .await;

    if drained.is_err() {
        warn!(
            timeout_secs = deadline.as_secs(),
            connections = actor_metrics.connection_count(),
            "Shutdown timed out, exiting with work in flight"
        );
    }

    root_token.cancel();
    info!("Bingo Controller shutdown complete");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bingo_controller=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed. This is acceptable because
/// without signal handlers, we cannot gracefully shut down the service.
async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
