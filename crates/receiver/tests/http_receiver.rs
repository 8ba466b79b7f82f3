//! Receiver integration tests.
//!
//! Drive the full router (decode, respond, encode) in both content modes, and
//! once over a real TCP listener.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use receiver::{router, serve, ReceiverState};
use responder::{FixedCoin, InstanceId, Outcome, Responder, SeededCoin};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;

fn app_with(instance: InstanceId, outcome: Option<Outcome>) -> Router {
    let coin: Box<dyn responder::Coin> = match outcome {
        Some(outcome) => Box::new(FixedCoin(outcome)),
        None => Box::new(SeededCoin::from_time()),
    };
    router(ReceiverState::new(Arc::new(Responder::new(instance, coin))))
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

#[tokio::test]
async fn test_binary_ping_reply() {
    let instance = InstanceId::new_random();
    let app = app_with(instance, Some(Outcome::Tails));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header("ce-specversion", "1.0")
        .header("ce-id", "abc-123")
        .header("ce-source", "client-1")
        .header("ce-type", "ping")
        .header("ce-region", "eu")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"zeta": 1, "alpha": 12345678901234567890123}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers().clone();
    assert_eq!(headers["ce-type"], "coinflip");
    assert_eq!(
        headers["ce-source"].to_str().unwrap(),
        format!("knative.dev/eventing/cmd/coinflip/{instance}")
    );
    assert_eq!(headers["ce-id"], "abc-123");
    assert_eq!(headers["ce-flip"], "tails");
    assert_eq!(headers["ce-region"], "eu");
    assert_eq!(headers[CONTENT_TYPE], "application/json");

    assert_eq!(
        body_bytes(response).await,
        br#"{"zeta": 1, "alpha": 12345678901234567890123}"#
    );
}

#[tokio::test]
async fn test_binary_reply_without_content_type() {
    let app = app_with(InstanceId::new_random(), Some(Outcome::Heads));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header("ce-specversion", "1.0")
        .header("ce-id", "abc-123")
        .header("ce-source", "client-1")
        .header("ce-type", "ping")
        .body(Body::from("42"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(CONTENT_TYPE).is_none());
    assert_eq!(body_bytes(response).await, b"42");
}

#[tokio::test]
async fn test_structured_ping_reply() {
    let instance = InstanceId::new_random();
    let app = app_with(instance, None);

    let event = json!({
        "specversion": "1.0",
        "id": "abc-123",
        "source": "client-1",
        "type": "ping",
        "subject": "orders/42",
        "data": {"n": 1}
    });
    let request = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header(CONTENT_TYPE, "application/cloudevents+json")
        .body(Body::from(event.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[CONTENT_TYPE],
        "application/cloudevents+json; charset=utf-8"
    );

    let reply: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(reply["type"], "coinflip");
    assert_eq!(
        reply["source"],
        format!("knative.dev/eventing/cmd/coinflip/{instance}")
    );
    assert_eq!(reply["id"], "abc-123");
    assert_eq!(reply["subject"], "orders/42");
    assert_eq!(reply["data"], json!({"n": 1}));
    assert!(matches!(reply["flip"].as_str(), Some("heads" | "tails")));
}

#[tokio::test]
async fn test_structured_reply_keeps_data_and_time_text() {
    let app = app_with(InstanceId::new_random(), Some(Outcome::Heads));

    let data = r#"{"zeta": 1, "alpha": 12345678901234567890123}"#;
    let event = format!(
        r#"{{"specversion":"1.0","id":"abc-123","source":"client-1","type":"ping","time":"2024-03-01T10:00:00.120Z","data":{data}}}"#
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header(CONTENT_TYPE, "application/cloudevents+json")
        .body(Body::from(event))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let reply = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(reply.contains(&format!(r#""data":{data}"#)), "{reply}");
    assert!(reply.contains(r#""time":"2024-03-01T10:00:00.120Z""#), "{reply}");
    assert!(reply.contains(r#""flip":"heads""#), "{reply}");
}

#[tokio::test]
async fn test_rejects_non_cloudevent() {
    let app = app_with(InstanceId::new_random(), None);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    #[derive(Deserialize)]
    struct ProblemCode {
        code: String,
    }
    let problem: ProblemCode = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(problem.code, "not_a_cloudevent");
}

#[tokio::test]
async fn test_rejects_missing_source() {
    let app = app_with(InstanceId::new_random(), None);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header("ce-specversion", "1.0")
        .header("ce-id", "abc-123")
        .header("ce-type", "ping")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_bytes(response).await;
    let message: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(message["code"], "invalid_event");
    assert_eq!(message["message"], "Missing required attribute 'source'");
}

#[tokio::test]
async fn test_rejects_batch_mode() {
    let app = app_with(InstanceId::new_random(), None);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header(CONTENT_TYPE, "application/cloudevents-batch+json")
        .body(Body::from("[]"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_get_on_root_not_allowed() {
    let app = app_with(InstanceId::new_random(), None);

    let request = Request::builder()
        .method(Method::GET)
        .uri("/")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let app = app_with(InstanceId::new_random(), None);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header("ce-specversion", "1.0")
        .header("ce-id", "1")
        .header("ce-source", "s")
        .header("ce-type", "t")
        .header(CONTENT_TYPE, "application/octet-stream")
        .body(Body::from(vec![0u8; receiver::MAX_BODY_BYTES + 1]))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_concurrent_requests_over_tcp() {
    let instance = InstanceId::new_random();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(serve(listener, app_with(instance, None), async move {
        let _ = shutdown_rx.await;
    }));

    let client = reqwest::Client::new();
    let url = format!("http://{addr}/");

    let mut handles = Vec::new();
    for i in 0..32 {
        let client = client.clone();
        let url = url.clone();
        handles.push(tokio::spawn(async move {
            let id = format!("evt-{i}");
            let response = client
                .post(&url)
                .header("ce-specversion", "1.0")
                .header("ce-id", &id)
                .header("ce-source", "client-1")
                .header("ce-type", "ping")
                .header(CONTENT_TYPE.as_str(), "text/plain")
                .body(id.clone())
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), reqwest::StatusCode::OK);

            let headers = response.headers().clone();
            let flip = headers["ce-flip"].to_str().unwrap().to_owned();
            assert_eq!(headers["ce-id"].to_str().unwrap(), id);
            assert_eq!(response.text().await.unwrap(), id);
            flip
        }));
    }

    let mut flips = Vec::new();
    for handle in handles {
        flips.push(handle.await.unwrap());
    }
    assert!(flips.iter().all(|f| f == "heads" || f == "tails"));

    shutdown_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}
