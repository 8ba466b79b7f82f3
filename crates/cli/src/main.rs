//! Coinflip responder entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Load configuration** from the environment ([`config::Config`]).
//! 2. **Wire observability**: `tracing-subscriber` with a JSON layer and an
//!    OpenTelemetry OTLP exporter ([`telemetry`]). Spans from every crate in
//!    the workspace flow through it.
//! 3. **Construct the responder** with a fresh process identity and a
//!    time-seeded coin, and hand it to the receiver.
//! 4. **Serve** until Ctrl-C or SIGTERM, then flush pending spans.
//!
//! Any startup failure ends the process with a non-zero exit status.

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use receiver::ReceiverState;
use responder::{InstanceId, Responder, SeededCoin};
use tokio::net::TcpListener;
use tracing::info;

mod config;
mod telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::Config::from_env()?;
    let telemetry = telemetry::init(&config).await?;

    let instance = InstanceId::new_random();
    let responder = Responder::new(instance, Box::new(SeededCoin::from_time()));
    info!(
        %instance,
        source = %responder.source(),
        port = config.port,
        "Configuration loaded"
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind receiver on {addr}"))?;
    info!(%addr, "Listening for events");

    let app = receiver::router(ReceiverState::new(Arc::new(responder)));
    let result = receiver::serve(listener, app, shutdown_signal()).await;

    info!("Receiver stopped, flushing traces");
    telemetry.shutdown();
    result.context("receiver failed")
}

/// Resolves on Ctrl-C, or on SIGTERM where supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
