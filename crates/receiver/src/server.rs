//! HTTP routes and the serve loop.
//!
//! `POST /` receives one event and answers with the reply event.
//! `GET /healthz` reports liveness for platform probes.

use std::{future::Future, sync::Arc, time::Duration};

use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, Request},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use responder::Responder;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::{binding, propagation, ReceiveError};

/// Largest request body accepted, in bytes.
pub const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Shared state handed to every request.
#[derive(Clone)]
pub struct ReceiverState {
    responder: Arc<Responder>,
}

impl ReceiverState {
    pub fn new(responder: Arc<Responder>) -> Self {
        Self { responder }
    }
}

/// Builds the receiver router.
pub fn router(state: ReceiverState) -> Router {
    Router::new()
        .route("/", post(receive))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let span = tracing::info_span!(
                        "http.request",
                        otel.kind = "server",
                        http.method = %request.method(),
                        http.target = %request.uri().path(),
                        http.status_code = tracing::field::Empty,
                    );
                    span.set_parent(propagation::extract_context(request.headers()));
                    span
                })
                .on_response(|response: &Response, latency: Duration, span: &Span| {
                    span.record("http.status_code", response.status().as_u16());
                    tracing::debug!(latency_ms = latency.as_millis() as u64, "Response sent");
                }),
        )
        .with_state(state)
}

/// Serves `app` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn receive(
    State(state): State<ReceiverState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ReceiveError> {
    let (event, mode) = binding::decode(&headers, &body)?;
    tracing::debug!(event.id = %event.id, event.source = %event.source, ?mode, "Received event");

    let reply = state.responder.respond(&event);
    binding::encode(&reply, mode)
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
struct HealthResponse {
    status: String,
    service: String,
    version: String,
    instance: String,
}

async fn healthz(State(state): State<ReceiverState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "coinflip".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        instance: state.responder.instance().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use responder::{FixedCoin, InstanceId, Outcome};

    use super::*;

    #[tokio::test]
    async fn test_healthz_reports_instance() {
        let instance = InstanceId::new_random();
        let state = ReceiverState::new(Arc::new(Responder::new(
            instance,
            Box::new(FixedCoin(Outcome::Heads)),
        )));

        let response = healthz(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let health: HealthResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(health.status, "ok");
        assert_eq!(health.instance, instance.to_string());
    }
}
