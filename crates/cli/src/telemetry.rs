//! Observability wiring.
//!
//! Installs one `tracing` subscriber for the whole process:
//!
//! - an [`EnvFilter`] (`RUST_LOG`, falling back to the configured level),
//! - a `tracing-opentelemetry` layer that turns spans into OpenTelemetry spans
//!   and exports them through OTLP/gRPC in batches,
//! - a fmt layer writing JSON (or pretty) log lines to stdout.
//!
//! The W3C TraceContext propagator is installed globally so the receiver can
//! parent request spans on the caller's trace.

use std::time::Duration;

use anyhow::{Context, Result};
use opentelemetry::{global, trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    propagation::TraceContextPropagator,
    runtime,
    trace::{Sampler, TracerProvider},
    Resource,
};
use tokio::net::TcpStream;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, LogFormat};

/// How long startup waits for the collector before giving up.
pub const COLLECTOR_TIMEOUT: Duration = Duration::from_secs(10);

const SERVICE_NAME: &str = "service.name";
const TRACER_NAME: &str = "coinflip";

/// Handle to the installed tracer provider; flushes on [`Telemetry::shutdown`].
pub struct Telemetry {
    provider: TracerProvider,
}

impl Telemetry {
    /// Flushes buffered spans and stops the exporter.
    pub fn shutdown(self) {
        if let Err(e) = self.provider.shutdown() {
            tracing::error!(error = %e, "Failed to shutdown TracerProvider");
        }
    }
}

/// Connects the trace exporter and installs the global subscriber.
///
/// Fails if the collector does not accept a connection within
/// [`COLLECTOR_TIMEOUT`] or if any part of the pipeline cannot be built.
pub async fn init(config: &Config) -> Result<Telemetry> {
    wait_for_collector(&config.collector_authority(), COLLECTOR_TIMEOUT).await?;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(config.otlp_endpoint.clone())
        .with_timeout(COLLECTOR_TIMEOUT)
        .build()
        .context("failed to create trace exporter")?;

    let resource = Resource::new(vec![KeyValue::new(
        SERVICE_NAME,
        config.service_name.clone(),
    )]);

    let provider = TracerProvider::builder()
        .with_sampler(Sampler::AlwaysOn)
        .with_resource(resource)
        .with_batch_exporter(exporter, runtime::Tokio)
        .build();

    global::set_text_map_propagator(TraceContextPropagator::new());
    global::set_tracer_provider(provider.clone());

    let otel_layer = tracing_opentelemetry::layer().with_tracer(provider.tracer(TRACER_NAME));
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter).with(otel_layer);

    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    }
    .context("failed to install tracing subscriber")?;

    tracing::info!(
        endpoint = %config.otlp_endpoint,
        service_name = %config.service_name,
        "Trace exporter connected"
    );
    Ok(Telemetry { provider })
}

/// Retries a TCP connect to `authority` until it succeeds or `timeout` passes.
async fn wait_for_collector(authority: &str, timeout: Duration) -> Result<()> {
    let attempt = async {
        loop {
            match TcpStream::connect(authority).await {
                Ok(_) => return,
                Err(_) => tokio::time::sleep(Duration::from_millis(200)).await,
            }
        }
    };
    tokio::time::timeout(timeout, attempt)
        .await
        .with_context(|| format!("trace collector at {authority} not reachable within {timeout:?}"))
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn test_wait_for_collector_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        wait_for_collector(&addr, Duration::from_secs(2)).await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_collector_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = wait_for_collector(&addr, Duration::from_millis(300))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not reachable"));
    }
}
